//! Member registry endpoints.

use api_types::member::{MemberNew, MemberView, MembersResponse, MigrateResponse, PayoutState};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, server::actor_for, user};
use engine::{Member, PayoutStatus};

pub(crate) fn map_payout_state(status: PayoutStatus) -> PayoutState {
    match status {
        PayoutStatus::Unpaid => PayoutState::Unpaid,
        PayoutStatus::Scheduled => PayoutState::Scheduled,
        PayoutStatus::Paid => PayoutState::Paid,
    }
}

pub(crate) fn map_member(member: Member) -> MemberView {
    MemberView {
        id: member.id,
        name: member.name,
        email: member.email,
        uid: member.uid,
        is_verified: member.is_verified,
        total_contributed_minor: member.total_contributed_minor,
        paid_dates: member.paid_dates.into_iter().collect(),
        payout_status: map_payout_state(member.payout_status),
        payout_month: member.payout_month,
        payout_amount_minor: member.payout_amount_minor,
        joined_at: member.joined_at,
    }
}

pub async fn list(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<MembersResponse>, ServerError> {
    let members = state.engine.list_members().await?;
    Ok(Json(MembersResponse {
        members: members.into_iter().map(map_member).collect(),
    }))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<MemberNew>,
) -> Result<(StatusCode, Json<MemberView>), ServerError> {
    let actor = actor_for(&user);
    let member = state
        .engine
        .add_member(
            &actor,
            &payload.name,
            &payload.email,
            payload.uid.as_deref(),
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_member(member))))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let actor = actor_for(&user);
    state.engine.remove_member(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn verify(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MemberView>, ServerError> {
    let actor = actor_for(&user);
    let member = state.engine.set_verified(&actor, id).await?;
    state.mailer.send(
        &member.email,
        "You are verified",
        "Your membership in the fund has been verified.",
    );
    Ok(Json(map_member(member)))
}

pub async fn migrate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<MigrateResponse>, ServerError> {
    let actor = actor_for(&user);
    let created = state.engine.migrate_users(&actor, Utc::now()).await?;
    Ok(Json(MigrateResponse { created }))
}
