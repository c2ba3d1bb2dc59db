//! Voting endpoints.

use api_types::vote::{TallyResponse, VoteCast, VoteCountView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::{ServerError, server::ServerState, server::actor_for, user};

pub async fn cast(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<VoteCast>,
) -> Result<StatusCode, ServerError> {
    let actor = actor_for(&user);
    match payload.candidate {
        Some(candidate) => state.engine.cast_vote(&actor, candidate, Utc::now()).await?,
        None => state.engine.clear_vote(&actor, Utc::now()).await?,
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn tally(
    Extension(_user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<TallyResponse>, ServerError> {
    let tally = state.engine.vote_tally().await?;
    Ok(Json(TallyResponse {
        tally: tally
            .into_iter()
            .map(|count| VoteCountView {
                member_id: count.member_id,
                votes: count.votes,
            })
            .collect(),
    }))
}
