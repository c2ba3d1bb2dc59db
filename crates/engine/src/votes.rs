//! Advisory votes for the next payout recipient, one row per voter.
//!
//! A row with an empty `candidate_member_id` is an explicit retraction and is
//! distinct from the voter never having voted (no row at all).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub voter_uid: String,
    pub candidate_member_id: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
