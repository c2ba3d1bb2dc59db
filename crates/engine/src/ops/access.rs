//! Capability checks shared by the write operations.

use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::actor::Actor;
use crate::members::{self, Member};
use crate::{LedgerError, ResultLedger};

/// Fail with `PermissionDenied` unless the actor is an administrator.
pub(crate) fn require_admin(actor: &Actor, operation: &str) -> ResultLedger<()> {
    if actor.admin {
        return Ok(());
    }
    Err(LedgerError::PermissionDenied(format!(
        "{operation} requires an administrator"
    )))
}

/// Administrators may act on anyone; everyone else only on their own record.
pub(crate) fn require_admin_or_self(
    actor: &Actor,
    member: &Member,
    operation: &str,
) -> ResultLedger<()> {
    if actor.admin {
        return Ok(());
    }
    if member.uid.as_deref() == Some(actor.user_id.as_str()) {
        return Ok(());
    }
    Err(LedgerError::PermissionDenied(format!(
        "{operation} on another member requires an administrator"
    )))
}

/// Load a member inside the transaction or fail with `NotFound`.
pub(crate) async fn require_member(
    tx: &DatabaseTransaction,
    member_id: Uuid,
) -> ResultLedger<Member> {
    let model = members::Entity::find_by_id(member_id.to_string())
        .one(tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("no member with id {member_id}")))?;
    Member::try_from(model)
}

pub(crate) async fn find_member_by_uid(
    tx: &DatabaseTransaction,
    uid: &str,
) -> ResultLedger<Option<Member>> {
    let model = members::Entity::find()
        .filter(members::Column::Uid.eq(uid))
        .one(tx)
        .await?;
    model.map(Member::try_from).transpose()
}
