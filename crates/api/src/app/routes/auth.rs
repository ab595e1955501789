//! Registration, login and logout. These routes sit outside the session gate.

use std::sync::Arc;

use axum::{
    Extension, Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use salonbook_auth::{Account, JwtClaims, NewAccount, normalize_email, verify_missing_account};

use crate::app::dto::{JsonBody, LoginRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;
use crate::middleware;

fn account_json(account: &Account) -> serde_json::Value {
    json!({
        "id": account.id.to_string(),
        "owner_id": account.owner_id.to_string(),
        "email": account.email,
        "display_name": account.display_name,
        "roles": account.roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    })
}

fn session_response(status: StatusCode, token: String, claims: &JwtClaims, account: &Account) -> ApiResult<Response> {
    let max_age = (claims.expires_at - claims.issued_at).num_seconds();
    let cookie = HeaderValue::from_str(&middleware::session_cookie(&token, max_age))
        .map_err(|_| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "could not create session"))?;
    let body = Json(json!({
        "token": token,
        "expires_at": claims.expires_at,
        "account": account_json(account),
    }));
    Ok((status, [(header::SET_COOKIE, cookie)], body).into_response())
}

fn invalid_credentials() -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "invalid_credentials", "email or password is incorrect")
}

fn password_task_failed(e: tokio::task::JoinError) -> ApiError {
    tracing::error!(error = %e, "password hashing task failed");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}

/// Create a new business: fresh owner, `owner` role, signed in immediately.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<NewAccount>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let account = tokio::task::spawn_blocking(move || Account::register(body, now))
        .await
        .map_err(password_task_failed)??;
    let account = services.stores.accounts.insert(account).await?;
    tracing::info!(account_id = %account.id, owner_id = %account.owner_id, "account registered");

    let (token, claims) = services.issue_session(account.id, account.owner_id, account.roles.clone())?;
    session_response(StatusCode::CREATED, token, &claims, &account)
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<Response> {
    let email = normalize_email(&body.email).map_err(|_| invalid_credentials())?;
    let found = services.stores.accounts.find_by_email(&email).await?;

    // Argon2 runs off the async workers, and an unknown email still pays for one verification.
    let password = body.password;
    let (found, valid) = tokio::task::spawn_blocking(move || {
        let valid = match &found {
            Some(account) => account.check_password(&password),
            None => verify_missing_account(&password),
        };
        (found, valid)
    })
    .await
    .map_err(password_task_failed)?;

    let account = match found {
        Some(account) if valid => account,
        Some(account) => {
            tracing::info!(account_id = %account.id, "failed login");
            return Err(invalid_credentials());
        }
        None => return Err(invalid_credentials()),
    };

    let (token, claims) = services.issue_session(account.id, account.owner_id, account.roles.clone())?;
    session_response(StatusCode::OK, token, &claims, &account)
}

pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, middleware::clear_session_cookie())],
    )
}
