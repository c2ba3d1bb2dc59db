//! Member records: identity-linked participants of the fund.
//!
//! `total_contributed_minor` and `paid_dates` are denormalized from approved
//! payments and are only ever mutated inside the same transaction as the
//! payment transition that justifies them.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    #[default]
    Unpaid,
    Scheduled,
    Paid,
}

impl PayoutStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Scheduled => "scheduled",
            Self::Paid => "paid",
        }
    }
}

impl TryFrom<&str> for PayoutStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "unpaid" => Ok(Self::Unpaid),
            "scheduled" => Ok(Self::Scheduled),
            "paid" => Ok(Self::Paid),
            other => Err(LedgerError::InvalidState(format!(
                "invalid payout status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// External identity id; absent for members added by an admin before
    /// they ever signed up.
    pub uid: Option<String>,
    pub is_verified: bool,
    pub total_contributed_minor: i64,
    pub paid_dates: BTreeSet<NaiveDate>,
    pub payout_status: PayoutStatus,
    pub payout_month: Option<i32>,
    pub payout_amount_minor: Option<i64>,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(name: String, email: String, uid: Option<String>, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            uid,
            is_verified: false,
            total_contributed_minor: 0,
            paid_dates: BTreeSet::new(),
            payout_status: PayoutStatus::Unpaid,
            payout_month: None,
            payout_amount_minor: None,
            joined_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub email: String,
    pub uid: Option<String>,
    pub is_verified: bool,
    pub total_contributed_minor: i64,
    /// JSON array of ISO dates with at least one approved payment.
    pub paid_dates: String,
    pub payout_status: String,
    pub payout_month: Option<i32>,
    pub payout_amount_minor: Option<i64>,
    pub joined_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn encode_paid_dates(dates: &BTreeSet<NaiveDate>) -> ResultLedger<String> {
    serde_json::to_string(dates)
        .map_err(|err| LedgerError::InvalidState(format!("invalid paid_dates: {err}")))
}

pub(crate) fn decode_paid_dates(raw: &str) -> ResultLedger<BTreeSet<NaiveDate>> {
    serde_json::from_str(raw)
        .map_err(|err| LedgerError::InvalidState(format!("invalid paid_dates: {err}")))
}

impl TryFrom<&Member> for ActiveModel {
    type Error = LedgerError;

    fn try_from(member: &Member) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(member.id.to_string()),
            name: ActiveValue::Set(member.name.clone()),
            email: ActiveValue::Set(member.email.clone()),
            uid: ActiveValue::Set(member.uid.clone()),
            is_verified: ActiveValue::Set(member.is_verified),
            total_contributed_minor: ActiveValue::Set(member.total_contributed_minor),
            paid_dates: ActiveValue::Set(encode_paid_dates(&member.paid_dates)?),
            payout_status: ActiveValue::Set(member.payout_status.as_str().to_string()),
            payout_month: ActiveValue::Set(member.payout_month),
            payout_amount_minor: ActiveValue::Set(member.payout_amount_minor),
            joined_at: ActiveValue::Set(member.joined_at),
        })
    }
}

impl TryFrom<Model> for Member {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound("member".to_string()))?,
            name: model.name,
            email: model.email,
            uid: model.uid,
            is_verified: model.is_verified,
            total_contributed_minor: model.total_contributed_minor,
            paid_dates: decode_paid_dates(&model.paid_dates)?,
            payout_status: PayoutStatus::try_from(model.payout_status.as_str())?,
            payout_month: model.payout_month,
            payout_amount_minor: model.payout_amount_minor,
            joined_at: model.joined_at,
        })
    }
}
