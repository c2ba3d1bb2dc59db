use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::LedgerError;

use serde::Serialize;
pub use server::{app, run_with_listener};

mod members;
mod notify;
mod payments;
mod payouts;
mod server;
mod statistics;
mod user;
mod votes;

pub mod types {
    pub mod member {
        pub use api_types::member::{
            MemberNew, MemberView, MembersResponse, MigrateResponse, PayoutState,
        };
    }

    pub mod payment {
        pub use api_types::payment::{
            PaymentMark, PaymentMarked, PaymentState, PaymentUndo, PaymentView, PaymentsResponse,
            PendingApprovalView, PendingResponse, ReminderRequest, ReminderResponse,
        };
    }

    pub mod payout {
        pub use api_types::payout::{PayoutRecord, PayoutSelect, PayoutSlotView, ScheduleResponse, SlotState};
    }

    pub mod vote {
        pub use api_types::vote::{TallyResponse, VoteCast, VoteCountView};
    }

    pub mod stats {
        pub use api_types::snapshot::SnapshotResponse;
        pub use api_types::stats::FundStats;
    }

    pub mod user {
        pub use api_types::user::RegisterUser;
    }
}

pub enum ServerError {
    Ledger(LedgerError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_ledger_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        LedgerError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadyResolved(_) | LedgerError::AlreadyCompleted(_) => StatusCode::CONFLICT,
        LedgerError::InvalidState(_) | LedgerError::InvalidAmount(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_ledger_error(err: LedgerError) -> String {
    match err {
        LedgerError::Store(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Ledger(err) => {
                (status_for_ledger_error(&err), message_for_ledger_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_maps_to_403() {
        let res =
            ServerError::from(LedgerError::PermissionDenied("nope".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn authentication_required_maps_to_401() {
        let res = ServerError::from(LedgerError::AuthenticationRequired).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn not_found_maps_to_404() {
        let res = ServerError::from(LedgerError::NotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn already_resolved_maps_to_409() {
        let res = ServerError::from(LedgerError::AlreadyResolved("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn already_completed_maps_to_409() {
        let res = ServerError::from(LedgerError::AlreadyCompleted("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_maps_to_422() {
        let res = ServerError::from(LedgerError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn database_error_is_masked_as_500() {
        let res = ServerError::from(LedgerError::Store(sea_orm::DbErr::Custom(
            "secret".to_string(),
        )))
        .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
