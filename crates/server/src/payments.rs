//! Contribution endpoints: mark, approve, reject, undo.

use api_types::payment::{
    PaymentMark, PaymentMarked, PaymentState, PaymentUndo, PaymentView, PaymentsResponse,
    PendingApprovalView, PendingResponse, ReminderRequest, ReminderResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, server::actor_for, user};
use engine::{Payment, PaymentStatus, PendingApproval};

fn map_status(status: PaymentStatus) -> PaymentState {
    match status {
        PaymentStatus::Pending => PaymentState::Pending,
        PaymentStatus::Approved => PaymentState::Approved,
        PaymentStatus::Rejected => PaymentState::Rejected,
        PaymentStatus::Cancelled => PaymentState::Cancelled,
    }
}

fn map_payment(payment: Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        member_id: payment.member_id,
        date: payment.date,
        amount_minor: payment.amount_minor,
        status: map_status(payment.status),
        requested_by: payment.requested_by,
        created_at: payment.created_at,
    }
}

pub(crate) fn map_pending(item: PendingApproval) -> PendingApprovalView {
    PendingApprovalView {
        payment_id: item.payment_id,
        member_id: item.member_id,
        member_name: item.member_name,
        date: item.date,
        amount_minor: item.amount_minor,
        requested_by: item.requested_by,
        created_at: item.created_at,
    }
}

pub async fn mark(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PaymentMark>,
) -> Result<(StatusCode, Json<PaymentMarked>), ServerError> {
    let actor = actor_for(&user);
    let outcome = state
        .engine
        .mark_payment(
            &actor,
            payload.member_id,
            payload.date,
            payload.amount_minor,
            Utc::now(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentMarked {
            payment_id: outcome.payment_id,
            status: map_status(outcome.status),
        }),
    ))
}

pub async fn approve(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentView>, ServerError> {
    let actor = actor_for(&user);
    let payment = state.engine.approve_payment(&actor, id, Utc::now()).await?;
    Ok(Json(map_payment(payment)))
}

pub async fn reject(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentView>, ServerError> {
    let actor = actor_for(&user);
    let payment = state.engine.reject_payment(&actor, id, Utc::now()).await?;
    Ok(Json(map_payment(payment)))
}

pub async fn undo(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PaymentUndo>,
) -> Result<Json<PaymentView>, ServerError> {
    let actor = actor_for(&user);
    let payment = state
        .engine
        .undo_payment(&actor, payload.member_id, payload.date, Utc::now())
        .await?;
    Ok(Json(map_payment(payment)))
}

pub async fn pending(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<PendingResponse>, ServerError> {
    let actor = actor_for(&user);
    let pending = state.engine.list_pending_approvals(&actor).await?;
    Ok(Json(PendingResponse {
        pending: pending.into_iter().map(map_pending).collect(),
    }))
}

/// Mail every member who has no approved contribution for the given date.
/// Notification is best effort and never affects ledger state.
pub async fn remind(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ReminderRequest>,
) -> Result<Json<ReminderResponse>, ServerError> {
    let actor = actor_for(&user);
    let unpaid = state.engine.unpaid_members(&actor, payload.date).await?;
    let reminded = unpaid.len() as u64;
    for member in unpaid {
        state.mailer.send(
            &member.email,
            "Contribution reminder",
            &format!(
                "Your contribution for {} has not been recorded yet.",
                payload.date
            ),
        );
    }
    Ok(Json(ReminderResponse { reminded }))
}

pub async fn list_for_member(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentsResponse>, ServerError> {
    let payments = state.engine.list_payments(id).await?;
    Ok(Json(PaymentsResponse {
        payments: payments.into_iter().map(map_payment).collect(),
    }))
}
