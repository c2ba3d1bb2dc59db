//! Payout slot endpoints.

use api_types::payout::{PayoutRecord, PayoutSelect, PayoutSlotView, ScheduleResponse, SlotState};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::{ServerError, server::ServerState, server::actor_for, user};
use engine::{PayoutSlot, SlotStatus};

pub(crate) fn map_slot(slot: PayoutSlot) -> PayoutSlotView {
    PayoutSlotView {
        id: slot.id,
        member_id: slot.member_id,
        month: slot.month,
        amount_minor: slot.amount_minor,
        status: match slot.status {
            SlotStatus::Scheduled => SlotState::Scheduled,
            SlotStatus::Completed => SlotState::Completed,
        },
        selected_by: slot.selected_by,
        selected_at: slot.selected_at,
        completed_by: slot.completed_by,
        completed_at: slot.completed_at,
    }
}

pub async fn schedule(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<ScheduleResponse>, ServerError> {
    let slots = state.engine.payout_schedule().await?;
    Ok(Json(ScheduleResponse {
        slots: slots.into_iter().map(map_slot).collect(),
    }))
}

pub async fn select(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PayoutSelect>,
) -> Result<(StatusCode, Json<PayoutSlotView>), ServerError> {
    let actor = actor_for(&user);
    let slot = state
        .engine
        .select_recipient(&actor, payload.member_id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(map_slot(slot))))
}

pub async fn record(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PayoutRecord>,
) -> Result<Json<PayoutSlotView>, ServerError> {
    let actor = actor_for(&user);
    let slot = state
        .engine
        .record_payout(&actor, payload.month, Utc::now())
        .await?;
    Ok(Json(map_slot(slot)))
}
