use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{members, notify, payments, payouts, statistics, user, votes};
use engine::{Actor, Engine};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    pub mailer: Arc<dyn notify::Mailer>,
}

pub(crate) fn actor_for(user: &user::Model) -> Actor {
    if user.is_admin {
        Actor::admin(user.username.clone())
    } else {
        Actor::member(user.username.clone())
    }
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/members", get(members::list).post(members::create))
        .route("/members/migrate", post(members::migrate))
        .route("/members/{id}", axum::routing::delete(members::remove))
        .route("/members/{id}/verify", post(members::verify))
        .route("/members/{id}/payments", get(payments::list_for_member))
        .route("/payments", post(payments::mark))
        .route("/payments/pending", get(payments::pending))
        .route("/payments/remind", post(payments::remind))
        .route("/payments/undo", post(payments::undo))
        .route("/payments/{id}/approve", post(payments::approve))
        .route("/payments/{id}/reject", post(payments::reject))
        .route("/payouts", get(payouts::schedule))
        .route("/payouts/select", post(payouts::select))
        .route("/payouts/record", post(payouts::record))
        .route("/votes", get(votes::tally).post(votes::cast))
        .route("/stats", get(statistics::get_stats))
        .route("/snapshot", get(statistics::get_snapshot))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/register", post(user::register))
        .with_state(state)
}

/// Build the application router. Used by `run_with_listener` and by tests
/// driving the router directly.
pub fn app(engine: Engine, db: DatabaseConnection) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
        db,
        mailer: Arc::new(notify::LogMailer),
    };
    router(state)
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine, db)).await
}
