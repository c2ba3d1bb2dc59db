//! Aggregate views of the ledger.

use api_types::snapshot::SnapshotResponse;
use api_types::stats::FundStats;
use axum::{Extension, Json, extract::State};

use crate::{ServerError, members, payments, payouts, server::ServerState, user};

pub async fn get_stats(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<FundStats>, ServerError> {
    let totals = state.engine.fund_totals().await?;
    let next = state.engine.next_scheduled_slot().await?;
    Ok(Json(FundStats {
        contributed_minor: totals.contributed_minor,
        paid_out_minor: totals.paid_out_minor,
        member_count: totals.member_count,
        next_payout_month: next.map(|slot| slot.month),
    }))
}

/// The whole ledger in one response, read in a single transaction on the
/// engine side.
pub async fn get_snapshot(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<SnapshotResponse>, ServerError> {
    let snapshot = state.engine.ledger_snapshot().await?;
    let next_payout_month = snapshot
        .payout_schedule
        .iter()
        .find(|slot| slot.completed_at.is_none())
        .map(|slot| slot.month);
    Ok(Json(SnapshotResponse {
        members: snapshot
            .members
            .into_iter()
            .map(members::map_member)
            .collect(),
        pending: snapshot
            .pending_approvals
            .into_iter()
            .map(payments::map_pending)
            .collect(),
        schedule: snapshot
            .payout_schedule
            .into_iter()
            .map(payouts::map_slot)
            .collect(),
        stats: FundStats {
            contributed_minor: snapshot.totals.contributed_minor,
            paid_out_minor: snapshot.totals.paid_out_minor,
            member_count: snapshot.totals.member_count,
            next_payout_month,
        },
    }))
}
