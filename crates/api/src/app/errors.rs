use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use salonbook_auth::{AuthzError, TokenError};
use salonbook_core::DomainError;
use salonbook_infra::{RepositoryError, WorkflowError};

/// Handler error: an already-rendered JSON error response.
///
/// Every error source converts through one of the `*_to_response` functions
/// below so status codes stay consistent across routes.
#[derive(Debug)]
pub struct ApiError(Response);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self(json_error(status, code, message))
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn status(&self) -> StatusCode {
        self.0.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(domain_error_to_response(e))
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        Self(repository_error_to_response(e))
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::Domain(e) => e.into(),
            WorkflowError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(e: AuthzError) -> Self {
        Self(json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => {
                tracing::error!(error = %msg, "failed to sign session token");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "could not create session")
            }
            other => Self::new(StatusCode::UNAUTHORIZED, "unauthorized", other.to_string()),
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn repository_error_to_response(err: RepositoryError) -> Response {
    match err {
        RepositoryError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        RepositoryError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        RepositoryError::InvalidQuery(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_query", msg),
        RepositoryError::Serialization(msg) => {
            tracing::warn!(error = %msg, "record (de)serialization failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
        RepositoryError::Database(msg) => {
            tracing::warn!(error = %msg, "storage error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage error")
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("x"), StatusCode::BAD_REQUEST),
            (DomainError::invariant("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn repository_errors_map_to_expected_statuses() {
        assert_eq!(ApiError::from(RepositoryError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(RepositoryError::Conflict("dup".into())).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(RepositoryError::InvalidQuery("sort".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RepositoryError::Database("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn workflow_errors_unwrap_to_their_source() {
        let e = WorkflowError::Domain(DomainError::invariant("overdraw"));
        assert_eq!(ApiError::from(e).status(), StatusCode::UNPROCESSABLE_ENTITY);
        let e = WorkflowError::Repository(RepositoryError::Conflict("booked".into()));
        assert_eq!(ApiError::from(e).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn authz_errors_are_forbidden() {
        let e = AuthzError::Forbidden("finance.read".into());
        assert_eq!(ApiError::from(e).status(), StatusCode::FORBIDDEN);
    }
}
