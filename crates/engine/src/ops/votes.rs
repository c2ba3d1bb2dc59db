//! Advisory voting for the next payout recipient.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, EntityTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::actor::Actor;
use crate::events::ChangeEvent;
use crate::ops::access::require_member;
use crate::ops::{Engine, with_tx};
use crate::votes;
use crate::{LedgerError, ResultLedger};

/// One line of the tally, candidates with at least one standing vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub member_id: Uuid,
    pub votes: u64,
}

impl Engine {
    /// Record the actor's vote for a candidate, replacing any earlier one.
    pub async fn cast_vote(
        &self,
        actor: &Actor,
        candidate: Uuid,
        now: DateTime<Utc>,
    ) -> ResultLedger<()> {
        with_tx!(self, |tx| {
            require_member(&tx, candidate).await?;
            upsert_vote(&tx, &actor.user_id, Some(candidate.to_string()), now).await
        })?;
        info!(voter = %actor.user_id, %candidate, "vote cast");
        self.publish(ChangeEvent::Votes);
        Ok(())
    }

    /// Withdraw the actor's vote.
    ///
    /// The row is kept with an empty candidate rather than deleted: a
    /// retracted vote is a statement, not the same as never having voted.
    pub async fn clear_vote(&self, actor: &Actor, now: DateTime<Utc>) -> ResultLedger<()> {
        with_tx!(self, |tx| upsert_vote(&tx, &actor.user_id, None, now).await)?;
        info!(voter = %actor.user_id, "vote cleared");
        self.publish(ChangeEvent::Votes);
        Ok(())
    }

    /// Count standing votes per candidate, most votes first, ties broken by
    /// member id so the order is stable.
    pub async fn vote_tally(&self) -> ResultLedger<Vec<VoteCount>> {
        let rows = with_tx!(self, |tx| Ok(votes::Entity::find().all(&tx).await?))?;
        let mut counts: BTreeMap<Uuid, u64> = BTreeMap::new();
        for row in rows {
            let Some(candidate) = row.candidate_member_id.as_deref() else {
                continue;
            };
            let member_id = Uuid::parse_str(candidate).map_err(|_| {
                LedgerError::InvalidState(format!("invalid vote candidate: {candidate}"))
            })?;
            *counts.entry(member_id).or_default() += 1;
        }
        let mut tally: Vec<VoteCount> = counts
            .into_iter()
            .map(|(member_id, votes)| VoteCount { member_id, votes })
            .collect();
        tally.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.member_id.cmp(&b.member_id)));
        Ok(tally)
    }
}

async fn upsert_vote(
    tx: &sea_orm::DatabaseTransaction,
    voter_uid: &str,
    candidate: Option<String>,
    now: DateTime<Utc>,
) -> ResultLedger<()> {
    let existing = votes::Entity::find_by_id(voter_uid.to_string())
        .one(tx)
        .await?;
    let active = votes::ActiveModel {
        voter_uid: ActiveValue::Set(voter_uid.to_string()),
        candidate_member_id: ActiveValue::Set(candidate),
        updated_at: ActiveValue::Set(now),
    };
    if existing.is_some() {
        votes::Entity::update(active).exec(tx).await?;
    } else {
        votes::Entity::insert(active).exec(tx).await?;
    }
    Ok(())
}
