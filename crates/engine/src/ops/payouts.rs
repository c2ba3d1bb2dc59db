//! Payout slot assignment and settlement.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::actor::Actor;
use crate::events::ChangeEvent;
use crate::members::{self, PayoutStatus};
use crate::ops::access::{require_admin, require_member};
use crate::ops::{Engine, with_tx};
use crate::payouts::{self, PayoutSlot, SlotStatus};
use crate::votes;
use crate::{LedgerError, ResultLedger};

impl Engine {
    /// Assign the next free payout slot to a member.
    ///
    /// Slots are handed out lowest month first. A member can hold at most
    /// one slot per rotation, and once every month is taken the rotation is
    /// full. Selection settles the question the votes were about, so the
    /// vote table is cleared in the same transaction.
    pub async fn select_recipient(
        &self,
        actor: &Actor,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultLedger<PayoutSlot> {
        require_admin(actor, "selecting a payout recipient")?;
        let slot = with_tx!(self, |tx| {
            let mut member = require_member(&tx, member_id).await?;

            let existing = payouts::Entity::find()
                .filter(payouts::Column::MemberId.eq(member_id.to_string()))
                .one(&tx)
                .await?;
            if existing.is_some() {
                return Err(LedgerError::InvalidState(format!(
                    "member {member_id} already holds a payout slot"
                )));
            }

            let taken: Vec<i32> = payouts::Entity::find()
                .all(&tx)
                .await?
                .into_iter()
                .map(|slot| slot.month)
                .collect();
            let month = (1..=self.slot_count as i32)
                .find(|month| !taken.contains(month))
                .ok_or_else(|| {
                    LedgerError::InvalidState("all payout slots are filled".to_string())
                })?;

            let slot = PayoutSlot::new(
                member_id,
                month,
                self.payout_amount_minor,
                actor.user_id.clone(),
                now,
            );
            payouts::Entity::insert(payouts::ActiveModel::from(&slot))
                .exec(&tx)
                .await?;

            member.payout_status = PayoutStatus::Scheduled;
            member.payout_month = Some(month);
            members::Entity::update(members::ActiveModel::try_from(&member)?)
                .exec(&tx)
                .await?;

            votes::Entity::delete_many().exec(&tx).await?;
            Ok(slot)
        })?;

        info!(member = %member_id, month = slot.month, by = %actor.user_id, "payout recipient selected");
        self.publish(ChangeEvent::Payouts);
        self.publish(ChangeEvent::Members);
        self.publish(ChangeEvent::Votes);
        Ok(slot)
    }

    /// Settle the slot for `month`: the pooled amount has been handed over.
    pub async fn record_payout(
        &self,
        actor: &Actor,
        month: i32,
        now: DateTime<Utc>,
    ) -> ResultLedger<PayoutSlot> {
        require_admin(actor, "recording a payout")?;
        let slot = with_tx!(self, |tx| {
            let model = payouts::Entity::find()
                .filter(payouts::Column::Month.eq(month))
                .one(&tx)
                .await?
                .ok_or_else(|| LedgerError::NotFound(format!("no payout slot for month {month}")))?;
            let mut slot = PayoutSlot::try_from(model)?;
            if slot.status == SlotStatus::Completed {
                return Err(LedgerError::AlreadyCompleted(format!(
                    "payout for month {month} is already recorded"
                )));
            }
            slot.status = SlotStatus::Completed;
            slot.completed_by = Some(actor.user_id.clone());
            slot.completed_at = Some(now);
            payouts::Entity::update(payouts::ActiveModel::from(&slot))
                .exec(&tx)
                .await?;

            let mut member = require_member(&tx, slot.member_id).await?;
            member.payout_status = PayoutStatus::Paid;
            member.payout_month = Some(slot.month);
            member.payout_amount_minor = Some(slot.amount_minor);
            members::Entity::update(members::ActiveModel::try_from(&member)?)
                .exec(&tx)
                .await?;
            Ok(slot)
        })?;

        info!(month, member = %slot.member_id, by = %actor.user_id, "payout recorded");
        self.publish(ChangeEvent::Payouts);
        self.publish(ChangeEvent::Members);
        Ok(slot)
    }

    /// All slots, scheduled and completed, ordered by month.
    pub async fn payout_schedule(&self) -> ResultLedger<Vec<PayoutSlot>> {
        with_tx!(self, |tx| schedule_in_tx(&tx).await)
    }

    /// The scheduled slot with the lowest month, if any.
    pub async fn next_scheduled_slot(&self) -> ResultLedger<Option<PayoutSlot>> {
        let schedule = self.payout_schedule().await?;
        Ok(schedule
            .into_iter()
            .find(|slot| slot.status == SlotStatus::Scheduled))
    }
}

pub(crate) async fn schedule_in_tx(tx: &DatabaseTransaction) -> ResultLedger<Vec<PayoutSlot>> {
    payouts::Entity::find()
        .order_by_asc(payouts::Column::Month)
        .all(tx)
        .await?
        .into_iter()
        .map(PayoutSlot::try_from)
        .collect()
}
