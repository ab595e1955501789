use std::str::FromStr;

use axum::{
    Json,
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{StatusCode, request::Parts},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use salonbook_core::RecordId;
use salonbook_infra::{ListQuery, Page, Pagination, Record, Sort};
use salonbook_staff::AttendanceStatus;

use crate::app::errors::{ApiError, ApiResult};

// -------------------------
// Extraction helpers
// -------------------------

/// `Json<T>` whose rejection uses the API's JSON error shape (400).
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())),
        }
    }
}

/// Optional JSON body: an empty body means `T::default()`; anything else must
/// parse as `T` or the request fails with 400 `invalid_body`.
pub struct OptionalJsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request("invalid_body", rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }
        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| ApiError::bad_request("invalid_body", e.to_string()))
    }
}

/// `Query<T>` whose rejection uses the API's JSON error shape (400 `invalid_query`).
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request("invalid_query", rejection.body_text())),
        }
    }
}

pub fn parse_id(raw: &str) -> ApiResult<RecordId> {
    RecordId::from_str(raw).map_err(|_| ApiError::bad_request("invalid_id", format!("'{raw}' is not a valid id")))
}

/// Raw query-string pairs, in request order.
pub type QueryPairs = Vec<(String, String)>;

/// Build a [`ListQuery`] from query-string pairs.
///
/// `q`, `limit`, `offset`, `sort`, `from` and `to` are reserved; every other
/// key is an equality filter checked later against the record's whitelist.
/// `from`/`to` accept RFC 3339 timestamps or `YYYY-MM-DD` dates; a bare `to`
/// date covers that whole day.
pub fn list_query(pairs: &[(String, String)]) -> ApiResult<ListQuery> {
    let mut query = ListQuery::new();
    let mut limit = None;
    let mut offset = None;
    let mut from = None;
    let mut to = None;

    for (key, value) in pairs {
        match key.as_str() {
            "q" => query = query.search(value.clone()),
            "limit" => limit = Some(parse_number("limit", value)?),
            "offset" => offset = Some(parse_number("offset", value)?),
            "sort" if !value.trim().is_empty() => query = query.sorted_by(Sort::parse(value)),
            "sort" => {}
            "from" => from = Some(parse_bound("from", value, false)?),
            "to" => to = Some(parse_bound("to", value, true)?),
            _ => query = query.filter(key.clone(), value.clone()),
        }
    }

    Ok(query.between(from, to).paginate(Pagination::new(limit, offset)))
}

fn parse_number(name: &str, raw: &str) -> ApiResult<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ApiError::bad_request("invalid_query", format!("{name} must be a non-negative integer")))
}

fn parse_bound(name: &str, raw: &str, end_of_day: bool) -> ApiResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request("invalid_query", format!("{name} must be an RFC 3339 timestamp or YYYY-MM-DD"))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time).and_utc())
}

/// Cache key for a list read: resource, owner, then the query pairs sorted so
/// parameter order does not matter. The pairs are JSON-encoded, so no value
/// can pass for a key/value boundary.
pub fn list_cache_key(resource: &str, owner: impl std::fmt::Display, pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().collect();
    sorted.sort();
    let qs = serde_json::to_string(&sorted).unwrap_or_default();
    format!("{resource}:{owner}?{qs}")
}

pub fn record_cache_key(resource: &str, owner: impl std::fmt::Display, id: RecordId) -> String {
    format!("{resource}:{owner}/{id}")
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckInRequest {
    /// `present` unless given; only worked statuses may check in.
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateVoucherRequest {
    pub code: String,
    pub amount: salonbook_core::Money,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// List envelope: `{ items, total, limit, offset, has_more }`.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

impl<R> From<Page<R>> for ListResponse<R> {
    fn from(page: Page<R>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            limit: page.pagination.limit,
            offset: page.pagination.offset,
            has_more: page.has_more,
        }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> ApiResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| {
        tracing::warn!(error = %e, "failed to render response");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", e.to_string())
    })
}

pub fn page_to_json<R: Record>(page: Page<R>) -> ApiResult<serde_json::Value> {
    to_json(&ListResponse::from(page))
}
