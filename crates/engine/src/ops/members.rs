//! Member registry operations and ledger-wide read models.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::actor::Actor;
use crate::events::ChangeEvent;
use crate::members::{self, Member, PayoutStatus};
use crate::ops::access::{find_member_by_uid, require_admin, require_admin_or_self, require_member};
use crate::ops::{Engine, normalize_required, with_tx};
use crate::payments::{self, PaymentStatus, PendingApproval};
use crate::payouts::{self, PayoutSlot, SlotStatus};
use crate::users;
use crate::{LedgerError, ResultLedger};

/// Aggregate money counters for the whole fund.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundTotals {
    pub contributed_minor: i64,
    pub paid_out_minor: i64,
    pub member_count: u64,
}

/// Per-member contribution line used by the snapshot and stats views.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberContribution {
    pub member_id: Uuid,
    pub name: String,
    pub total_contributed_minor: i64,
    pub weeks_paid: usize,
}

/// One consistent read of the whole ledger, assembled in a single
/// transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub members: Vec<Member>,
    pub pending_approvals: Vec<PendingApproval>,
    pub payout_schedule: Vec<PayoutSlot>,
    pub totals: FundTotals,
}

impl Engine {
    /// Add a member, or link an existing one.
    ///
    /// Members are keyed by email: adding an email that already exists
    /// updates the name and attaches `uid` if the row had none, instead of
    /// creating a duplicate. Creating an unlinked member (no `uid`) is an
    /// admin action; self-registration must carry the actor's own uid.
    pub async fn add_member(
        &self,
        actor: &Actor,
        name: &str,
        email: &str,
        uid: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultLedger<Member> {
        let name = normalize_required(name, "member name")?;
        let email = normalize_required(email, "member email")?.to_lowercase();
        match uid {
            None => require_admin(actor, "adding an unlinked member")?,
            Some(uid) if uid != actor.user_id && !actor.admin => {
                return Err(LedgerError::PermissionDenied(
                    "cannot register a member for another user".to_string(),
                ));
            }
            Some(_) => {}
        }

        let member = with_tx!(self, |tx| {
            let existing = members::Entity::find()
                .filter(members::Column::Email.eq(email.clone()))
                .one(&tx)
                .await?;
            match existing {
                Some(model) => {
                    let mut member = Member::try_from(model)?;
                    if !actor.admin
                        && member.uid.is_some()
                        && member.uid.as_deref() != Some(actor.user_id.as_str())
                    {
                        return Err(LedgerError::PermissionDenied(format!(
                            "member {} is linked to another user",
                            member.email
                        )));
                    }
                    member.name = name;
                    if member.uid.is_none() {
                        member.uid = uid.map(str::to_string);
                    }
                    let active = members::ActiveModel::try_from(&member)?;
                    members::Entity::update(active).exec(&tx).await?;
                    Ok(member)
                }
                None => {
                    let member = Member::new(name, email, uid.map(str::to_string), now);
                    let active = members::ActiveModel::try_from(&member)?;
                    members::Entity::insert(active).exec(&tx).await?;
                    Ok(member)
                }
            }
        })?;

        info!(member = %member.id, by = %actor.user_id, "member added");
        self.publish(ChangeEvent::Members);
        Ok(member)
    }

    pub async fn get_member(&self, member_id: Uuid) -> ResultLedger<Member> {
        with_tx!(self, |tx| require_member(&tx, member_id).await)
    }

    pub async fn find_member(&self, uid: &str) -> ResultLedger<Option<Member>> {
        with_tx!(self, |tx| find_member_by_uid(&tx, uid).await)
    }

    pub async fn list_members(&self) -> ResultLedger<Vec<Member>> {
        with_tx!(self, |tx| list_members_in_tx(&tx).await)
    }

    /// Flag a member's identity as verified. Members may verify themselves;
    /// admins may verify anyone.
    pub async fn set_verified(&self, actor: &Actor, member_id: Uuid) -> ResultLedger<Member> {
        let member = with_tx!(self, |tx| {
            let mut member = require_member(&tx, member_id).await?;
            require_admin_or_self(actor, &member, "verifying")?;
            if !member.is_verified {
                member.is_verified = true;
                let active = members::ActiveModel::try_from(&member)?;
                members::Entity::update(active).exec(&tx).await?;
            }
            Ok(member)
        })?;
        self.publish(ChangeEvent::Members);
        Ok(member)
    }

    /// Remove a member from the registry.
    ///
    /// Refused while the member holds a completed payout: that money already
    /// left the pool and deleting the row would orphan it. A merely scheduled
    /// slot is released instead. Payment rows are kept for audit.
    pub async fn remove_member(&self, actor: &Actor, member_id: Uuid) -> ResultLedger<()> {
        require_admin(actor, "removing a member")?;
        with_tx!(self, |tx| {
            let member = require_member(&tx, member_id).await?;
            if member.payout_status == PayoutStatus::Paid {
                return Err(LedgerError::InvalidState(format!(
                    "member {member_id} has received a payout and cannot be removed"
                )));
            }
            let slot = payouts::Entity::find()
                .filter(payouts::Column::MemberId.eq(member_id.to_string()))
                .one(&tx)
                .await?;
            if let Some(slot) = slot {
                let slot = PayoutSlot::try_from(slot)?;
                if slot.status == SlotStatus::Completed {
                    return Err(LedgerError::InvalidState(format!(
                        "member {member_id} holds a completed payout slot"
                    )));
                }
                payouts::Entity::delete_by_id(slot.id.to_string())
                    .exec(&tx)
                    .await?;
            }
            members::Entity::delete_by_id(member_id.to_string())
                .exec(&tx)
                .await?;
            Ok(())
        })?;
        info!(member = %member_id, by = %actor.user_id, "member removed");
        self.publish(ChangeEvent::Members);
        self.publish(ChangeEvent::Payouts);
        Ok(())
    }

    /// Backfill member rows for users that never got one. Returns the number
    /// of members created.
    pub async fn migrate_users(&self, actor: &Actor, now: DateTime<Utc>) -> ResultLedger<u64> {
        require_admin(actor, "migrating users")?;
        let created = with_tx!(self, |tx| {
            let users = users::Entity::find().all(&tx).await?;
            let mut created = 0;
            for user in users {
                if find_member_by_uid(&tx, &user.username).await?.is_some() {
                    continue;
                }
                let taken = members::Entity::find()
                    .filter(members::Column::Email.eq(user.email.to_lowercase()))
                    .one(&tx)
                    .await?;
                if taken.is_some() {
                    continue;
                }
                let member = Member::new(
                    user.name.clone(),
                    user.email.to_lowercase(),
                    Some(user.username.clone()),
                    now,
                );
                let active = members::ActiveModel::try_from(&member)?;
                members::Entity::insert(active).exec(&tx).await?;
                created += 1;
            }
            Ok(created)
        })?;
        if created > 0 {
            info!(created, by = %actor.user_id, "users migrated to members");
            self.publish(ChangeEvent::Members);
        }
        Ok(created)
    }

    pub async fn fund_totals(&self) -> ResultLedger<FundTotals> {
        with_tx!(self, |tx| fund_totals_in_tx(&tx).await)
    }

    /// Assemble the full ledger view in one transaction so the pieces cannot
    /// disagree with each other.
    pub async fn ledger_snapshot(&self) -> ResultLedger<LedgerSnapshot> {
        with_tx!(self, |tx| {
            let members = list_members_in_tx(&tx).await?;
            let pending_approvals = super::payments::list_pending_in_tx(&tx).await?;
            let payout_schedule = super::payouts::schedule_in_tx(&tx).await?;
            let totals = fund_totals_in_tx(&tx).await?;
            Ok(LedgerSnapshot {
                members,
                pending_approvals,
                payout_schedule,
                totals,
            })
        })
    }

    pub async fn member_contributions(&self) -> ResultLedger<Vec<MemberContribution>> {
        let members = self.list_members().await?;
        Ok(members
            .into_iter()
            .map(|member| MemberContribution {
                member_id: member.id,
                name: member.name,
                total_contributed_minor: member.total_contributed_minor,
                weeks_paid: member.paid_dates.len(),
            })
            .collect())
    }

    /// Rebuild every member's denormalized totals from the approved payment
    /// rows. Returns the number of members whose counters were corrected.
    pub async fn recompute_totals(&self, actor: &Actor) -> ResultLedger<u64> {
        require_admin(actor, "recomputing totals")?;
        let corrected = with_tx!(self, |tx| {
            let members_list = list_members_in_tx(&tx).await?;
            let mut corrected = 0;
            for mut member in members_list {
                let approved = payments::Entity::find()
                    .filter(payments::Column::MemberId.eq(member.id.to_string()))
                    .filter(payments::Column::Status.eq(PaymentStatus::Approved.as_str()))
                    .all(&tx)
                    .await?;
                let total: i64 = approved.iter().map(|payment| payment.amount_minor).sum();
                let dates = approved.iter().map(|payment| payment.date).collect();
                if member.total_contributed_minor != total || member.paid_dates != dates {
                    member.total_contributed_minor = total;
                    member.paid_dates = dates;
                    let active = members::ActiveModel::try_from(&member)?;
                    members::Entity::update(active).exec(&tx).await?;
                    corrected += 1;
                }
            }
            Ok(corrected)
        })?;
        if corrected > 0 {
            info!(corrected, by = %actor.user_id, "member totals recomputed");
            self.publish(ChangeEvent::Members);
        }
        Ok(corrected)
    }
}

pub(crate) async fn list_members_in_tx(tx: &DatabaseTransaction) -> ResultLedger<Vec<Member>> {
    members::Entity::find()
        .order_by_asc(members::Column::JoinedAt)
        .all(tx)
        .await?
        .into_iter()
        .map(Member::try_from)
        .collect()
}

async fn fund_totals_in_tx(tx: &DatabaseTransaction) -> ResultLedger<FundTotals> {
    let members = list_members_in_tx(tx).await?;
    let contributed_minor = members
        .iter()
        .map(|member| member.total_contributed_minor)
        .sum();
    let paid_out_minor = members
        .iter()
        .filter(|member| member.payout_status == PayoutStatus::Paid)
        .filter_map(|member| member.payout_amount_minor)
        .sum();
    let member_count = members::Entity::find().count(tx).await?;
    Ok(FundTotals {
        contributed_minor,
        paid_out_minor,
        member_count,
    })
}
