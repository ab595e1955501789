//! Handler building blocks shared by every resource router.

use axum::{Json, http::StatusCode};
use serde::Serialize;
use serde_json::Value;

use salonbook_core::{OwnerId, RecordId};
use salonbook_infra::{Record, Repository, record_tag, resource_tag};

use crate::app::dto;
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;

/// Cached page of `R` for the owner, shaped as the list envelope.
pub async fn list_records<R: Record>(
    services: &AppServices,
    owner: OwnerId,
    repo: &dyn Repository<R>,
    pairs: &[(String, String)],
) -> ApiResult<Json<Value>> {
    let query = dto::list_query(pairs)?;
    let key = dto::list_cache_key(R::RESOURCE, owner, pairs);
    let value = services
        .cached(key, vec![resource_tag(R::RESOURCE, owner)], || async move {
            let page = repo.list(owner, &query).await?;
            dto::page_to_json(page)
        })
        .await?;
    Ok(Json(value))
}

/// Cached single record; another owner's record is a 404.
pub async fn get_record<R: Record>(
    services: &AppServices,
    owner: OwnerId,
    repo: &dyn Repository<R>,
    id: RecordId,
) -> ApiResult<Json<Value>> {
    let key = dto::record_cache_key(R::RESOURCE, owner, id);
    let tags = vec![resource_tag(R::RESOURCE, owner), record_tag(R::RESOURCE, owner, id)];
    let value = services
        .cached(key, tags, || async move {
            let record = repo.require(owner, id).await?;
            dto::to_json(&record)
        })
        .await?;
    Ok(Json(value))
}

pub async fn insert_record<R: Record>(
    services: &AppServices,
    repo: &dyn Repository<R>,
    record: R,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let saved = repo.insert(record).await?;
    services.invalidate(saved.owner_id(), &[R::RESOURCE]);
    created(&saved)
}

pub async fn update_record<R: Record>(
    services: &AppServices,
    repo: &dyn Repository<R>,
    record: R,
) -> ApiResult<Json<Value>> {
    let saved = repo.update(record).await?;
    services.invalidate_record(R::RESOURCE, saved.owner_id(), *saved.id());
    ok(&saved)
}

pub async fn delete_record<R: Record>(
    services: &AppServices,
    owner: OwnerId,
    repo: &dyn Repository<R>,
    id: RecordId,
) -> ApiResult<StatusCode> {
    if !repo.delete(owner, id).await? {
        return Err(ApiError::not_found(format!("{} record not found", R::RESOURCE)));
    }
    services.invalidate_record(R::RESOURCE, owner, id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn ok<T: Serialize>(value: &T) -> ApiResult<Json<Value>> {
    Ok(Json(dto::to_json(value)?))
}

pub fn created<T: Serialize>(value: &T) -> ApiResult<(StatusCode, Json<Value>)> {
    Ok((StatusCode::CREATED, Json(dto::to_json(value)?)))
}

/// Query pairs with `field=value` appended, for nested list routes
/// (e.g. a customer's appointments).
pub fn scoped(pairs: Vec<(String, String)>, field: &str, value: impl ToString) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = pairs.into_iter().filter(|(k, _)| k != field).collect();
    pairs.push((field.to_string(), value.to_string()));
    pairs
}
