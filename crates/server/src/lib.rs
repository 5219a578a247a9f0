use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod balances;
mod expenses;
mod groups;
mod invitations;
mod memberships;
mod server;
mod settlements;
mod user;

pub mod types {
    pub mod group {
        pub use api_types::group::{GroupCreated, GroupNew, GroupView, GroupsResponse};
        pub use engine::Group;
    }

    pub mod membership {
        pub use api_types::membership::{MemberUpsert, MemberView, MembersResponse, MembershipRole};
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseCreated, ExpenseNew, ExpenseView, ExpensesResponse, SplitNew, SplitView,
        };
    }

    pub mod balance {
        pub use api_types::balance::{BalanceResponse, BalancesResponse, GroupBalance};
    }

    pub mod settlement {
        pub use api_types::settlement::{
            SettleNew, SettleOutcome, SettlementView, SettlementsResponse, SuggestionView,
            SuggestionsResponse,
        };
    }

    pub mod invitation {
        pub use api_types::invitation::{
            InvitationAccept, InvitationAccepted, InvitationCreated, InvitationNew,
            InvitationStatus, InvitationView, InvitationsResponse,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
    code: &'static str,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) | EngineError::NotAMember(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) | EngineError::InvalidToken => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::SameParty(_)
        | EngineError::InvalidRole(_)
        | EngineError::InvalidEmail(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Stable machine-readable code for each engine failure; clients should
/// branch on this rather than the human-readable message.
fn code_for_engine_error(err: &EngineError) -> &'static str {
    match err {
        EngineError::InvalidAmount(_) => "invalid_amount",
        EngineError::SameParty(_) => "same_party",
        EngineError::InvalidRole(_) => "invalid_role",
        EngineError::InvalidEmail(_) => "invalid_email",
        EngineError::Forbidden(_) => "forbidden",
        EngineError::NotAMember(_) => "not_a_member",
        EngineError::InvalidToken => "invalid_or_expired_token",
        EngineError::KeyNotFound(_) => "not_found",
        EngineError::ExistingKey(_) => "conflict",
        EngineError::Database(_) => "store_unavailable",
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, error) = match self {
            ServerError::Engine(err) => (
                status_for_engine_error(&err),
                code_for_engine_error(&err),
                message_for_engine_error(err),
            ),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, "bad_request", err),
        };

        (status, Json(Error { error, code })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_a_member_maps_to_403() {
        let res = ServerError::from(EngineError::NotAMember("bob".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_invalid_token_maps_to_404() {
        let res = ServerError::from(EngineError::InvalidToken).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = ServerError::from(EngineError::SameParty("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = ServerError::from(EngineError::InvalidEmail("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            code_for_engine_error(&EngineError::InvalidToken),
            "invalid_or_expired_token"
        );
        assert_eq!(
            code_for_engine_error(&EngineError::KeyNotFound("x".to_string())),
            "not_found"
        );
        assert_eq!(
            code_for_engine_error(&EngineError::SameParty("x".to_string())),
            "same_party"
        );
        assert_eq!(
            code_for_engine_error(&EngineError::InvalidEmail("x".to_string())),
            "invalid_email"
        );
    }
}
