//! User accounts and registration.

use api_types::user::RegisterUser;
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use sea_orm::{ActiveValue, entity::prelude::*};

use crate::{ServerError, server::ServerState};
use engine::Actor;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Open a user account and its member record in the fund.
///
/// The only unauthenticated endpoint. The account never starts as an
/// administrator.
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterUser>,
) -> Result<StatusCode, ServerError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ServerError::Generic(
            "username and password are required".to_string(),
        ));
    }

    let existing = Entity::find_by_id(payload.username.clone())
        .one(&state.db)
        .await
        .map_err(|err| ServerError::Generic(err.to_string()))?;
    if existing.is_some() {
        return Err(ServerError::Generic("username is taken".to_string()));
    }

    let user = ActiveModel {
        username: ActiveValue::Set(payload.username.clone()),
        password: ActiveValue::Set(payload.password),
        name: ActiveValue::Set(payload.name.clone()),
        email: ActiveValue::Set(payload.email.clone()),
        is_admin: ActiveValue::Set(false),
    };
    user.insert(&state.db)
        .await
        .map_err(|err| ServerError::Generic(err.to_string()))?;

    let actor = Actor::member(payload.username.clone());
    state
        .engine
        .add_member(
            &actor,
            &payload.name,
            &payload.email,
            Some(&payload.username),
            Utc::now(),
        )
        .await?;

    state.mailer.send(
        &payload.email,
        "Welcome to the fund",
        "Your account was created. Ask an administrator to verify you.",
    );

    Ok(StatusCode::CREATED)
}
