//! The contribution state machine: claim, approve, reject, undo.
//!
//! A member's denormalized counters are only ever touched in the same
//! transaction as the payment row transition, so a crash can never leave a
//! credit without its approved payment or the reverse.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::actor::Actor;
use crate::events::ChangeEvent;
use crate::members::{self, Member};
use crate::ops::access::{require_admin, require_admin_or_self, require_member};
use crate::ops::{Engine, with_tx};
use crate::payments::{self, MarkOutcome, Payment, PaymentStatus, PendingApproval};
use crate::{LedgerError, ResultLedger};

impl Engine {
    /// Claim a contribution for `(member, date)`.
    ///
    /// Marked by an admin the payment is approved and credited immediately;
    /// marked by the member themselves it lands in the approval queue. With
    /// no explicit amount the engine's configured weekly contribution is
    /// used. A slot with a pending or approved payment cannot be claimed
    /// again until that payment is rejected or undone.
    pub async fn mark_payment(
        &self,
        actor: &Actor,
        member_id: Uuid,
        date: NaiveDate,
        amount_minor: Option<i64>,
        now: DateTime<Utc>,
    ) -> ResultLedger<MarkOutcome> {
        let amount = amount_minor.unwrap_or(self.contribution_amount_minor);
        let outcome = with_tx!(self, |tx| {
            let mut member = require_member(&tx, member_id).await?;
            require_admin_or_self(actor, &member, "marking a payment")?;

            if find_active_payment(&tx, member_id, date).await?.is_some() {
                return Err(LedgerError::InvalidState(format!(
                    "member {member_id} already has an active payment for {date}"
                )));
            }

            let status = if actor.admin {
                PaymentStatus::Approved
            } else {
                PaymentStatus::Pending
            };
            let mut payment =
                Payment::new(member_id, date, amount, status, actor.user_id.clone(), now)?;
            if actor.admin {
                payment.approved_by = Some(actor.user_id.clone());
                payment.approved_at = Some(now);
                credit(&tx, &mut member, &payment).await?;
            }
            payments::Entity::insert(payments::ActiveModel::from(&payment))
                .exec(&tx)
                .await?;
            Ok(MarkOutcome {
                payment_id: payment.id,
                status,
            })
        })?;

        info!(member = %member_id, %date, status = outcome.status.as_str(), by = %actor.user_id, "payment marked");
        self.publish(ChangeEvent::Payments);
        if outcome.status == PaymentStatus::Approved {
            self.publish(ChangeEvent::Members);
        }
        Ok(outcome)
    }

    /// Approve a pending payment and credit the member.
    pub async fn approve_payment(
        &self,
        actor: &Actor,
        payment_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultLedger<Payment> {
        require_admin(actor, "approving a payment")?;
        let payment = with_tx!(self, |tx| {
            let mut payment = require_payment(&tx, payment_id).await?;
            if payment.status != PaymentStatus::Pending {
                return Err(LedgerError::AlreadyResolved(format!(
                    "payment {payment_id} is {}",
                    payment.status.as_str()
                )));
            }
            let mut member = require_member(&tx, payment.member_id).await?;
            payment.status = PaymentStatus::Approved;
            payment.approved_by = Some(actor.user_id.clone());
            payment.approved_at = Some(now);
            credit(&tx, &mut member, &payment).await?;
            payments::Entity::update(payments::ActiveModel::from(&payment))
                .exec(&tx)
                .await?;
            Ok(payment)
        })?;

        info!(payment = %payment_id, by = %actor.user_id, "payment approved");
        self.publish(ChangeEvent::Payments);
        self.publish(ChangeEvent::Members);
        Ok(payment)
    }

    /// Reject a pending payment. The row is kept for audit and the
    /// `(member, date)` slot becomes claimable again.
    pub async fn reject_payment(
        &self,
        actor: &Actor,
        payment_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultLedger<Payment> {
        require_admin(actor, "rejecting a payment")?;
        let payment = with_tx!(self, |tx| {
            let mut payment = require_payment(&tx, payment_id).await?;
            if payment.status != PaymentStatus::Pending {
                return Err(LedgerError::AlreadyResolved(format!(
                    "payment {payment_id} is {}",
                    payment.status.as_str()
                )));
            }
            payment.status = PaymentStatus::Rejected;
            payment.rejected_by = Some(actor.user_id.clone());
            payment.rejected_at = Some(now);
            payments::Entity::update(payments::ActiveModel::from(&payment))
                .exec(&tx)
                .await?;
            Ok(payment)
        })?;

        info!(payment = %payment_id, by = %actor.user_id, "payment rejected");
        self.publish(ChangeEvent::Payments);
        Ok(payment)
    }

    /// Cancel the active payment for `(member, date)`, admin or self.
    ///
    /// An approved payment is reversed using the amount stored on the row,
    /// not the current configured contribution, so undo stays exact even
    /// after the configured amount changes.
    pub async fn undo_payment(
        &self,
        actor: &Actor,
        member_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> ResultLedger<Payment> {
        let payment = with_tx!(self, |tx| {
            let mut member = require_member(&tx, member_id).await?;
            require_admin_or_self(actor, &member, "undoing a payment")?;
            let mut payment = find_active_payment(&tx, member_id, date)
                .await?
                .ok_or_else(|| {
                    LedgerError::NotFound(format!(
                        "no active payment for member {member_id} on {date}"
                    ))
                })?;
            if payment.status == PaymentStatus::Approved {
                debit(&tx, &mut member, &payment).await?;
            }
            payment.status = PaymentStatus::Cancelled;
            payment.cancelled_by = Some(actor.user_id.clone());
            payment.cancelled_at = Some(now);
            payments::Entity::update(payments::ActiveModel::from(&payment))
                .exec(&tx)
                .await?;
            Ok(payment)
        })?;

        info!(member = %member_id, %date, by = %actor.user_id, "payment undone");
        self.publish(ChangeEvent::Payments);
        if payment.approved_at.is_some() {
            self.publish(ChangeEvent::Members);
        }
        Ok(payment)
    }

    /// The approval queue: every pending payment, oldest first.
    pub async fn list_pending_approvals(&self, actor: &Actor) -> ResultLedger<Vec<PendingApproval>> {
        require_admin(actor, "listing pending approvals")?;
        with_tx!(self, |tx| list_pending_in_tx(&tx).await)
    }

    /// Members with no approved contribution for `date`.
    ///
    /// Backs the reminder surface, so it is gated like the other admin
    /// views: a pending claim does not count as paid until it is approved.
    pub async fn unpaid_members(
        &self,
        actor: &Actor,
        date: NaiveDate,
    ) -> ResultLedger<Vec<Member>> {
        require_admin(actor, "listing unpaid members")?;
        let members = with_tx!(self, |tx| super::members::list_members_in_tx(&tx).await)?;
        Ok(members
            .into_iter()
            .filter(|member| !member.paid_dates.contains(&date))
            .collect())
    }

    /// Full payment history for one member, newest first.
    pub async fn list_payments(&self, member_id: Uuid) -> ResultLedger<Vec<Payment>> {
        with_tx!(self, |tx| {
            payments::Entity::find()
                .filter(payments::Column::MemberId.eq(member_id.to_string()))
                .order_by_desc(payments::Column::CreatedAt)
                .all(&tx)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect()
        })
    }
}

async fn require_payment(tx: &DatabaseTransaction, payment_id: Uuid) -> ResultLedger<Payment> {
    let model = payments::Entity::find_by_id(payment_id.to_string())
        .one(tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("no payment with id {payment_id}")))?;
    Payment::try_from(model)
}

/// Pending and approved payments occupy their `(member, date)` slot;
/// rejected and cancelled ones free it again.
async fn find_active_payment(
    tx: &DatabaseTransaction,
    member_id: Uuid,
    date: NaiveDate,
) -> ResultLedger<Option<Payment>> {
    let model = payments::Entity::find()
        .filter(payments::Column::MemberId.eq(member_id.to_string()))
        .filter(payments::Column::Date.eq(date))
        .filter(
            payments::Column::Status.is_in([
                PaymentStatus::Pending.as_str(),
                PaymentStatus::Approved.as_str(),
            ]),
        )
        .one(tx)
        .await?;
    model.map(Payment::try_from).transpose()
}

async fn credit(
    tx: &DatabaseTransaction,
    member: &mut Member,
    payment: &Payment,
) -> ResultLedger<()> {
    member.total_contributed_minor += payment.amount_minor;
    member.paid_dates.insert(payment.date);
    members::Entity::update(members::ActiveModel::try_from(&*member)?)
        .exec(tx)
        .await?;
    Ok(())
}

async fn debit(
    tx: &DatabaseTransaction,
    member: &mut Member,
    payment: &Payment,
) -> ResultLedger<()> {
    member.total_contributed_minor -= payment.amount_minor;
    member.paid_dates.remove(&payment.date);
    members::Entity::update(members::ActiveModel::try_from(&*member)?)
        .exec(tx)
        .await?;
    Ok(())
}

pub(crate) async fn list_pending_in_tx(
    tx: &DatabaseTransaction,
) -> ResultLedger<Vec<PendingApproval>> {
    let rows = payments::Entity::find()
        .filter(payments::Column::Status.eq(PaymentStatus::Pending.as_str()))
        .find_also_related(members::Entity)
        .order_by_asc(payments::Column::CreatedAt)
        .all(tx)
        .await?;
    rows.into_iter()
        .map(|(payment, member)| {
            let payment = Payment::try_from(payment)?;
            let member_name = member.map(|member| member.name).ok_or_else(|| {
                LedgerError::NotFound(format!("no member for payment {}", payment.id))
            })?;
            Ok(PendingApproval {
                payment_id: payment.id,
                member_id: payment.member_id,
                member_name,
                date: payment.date,
                amount_minor: payment.amount_minor,
                requested_by: payment.requested_by,
                created_at: payment.created_at,
            })
        })
        .collect()
}
