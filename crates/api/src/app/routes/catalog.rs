use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use serde_json::Value;

use salonbook_catalog::{ServiceDraft, ServiceItem, ServicePatch};

use crate::app::dto::{self, JsonBody, QueryPairs};
use crate::app::errors::ApiResult;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "services";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route("/:id", get(get_service).patch(update_service).delete(delete_service))
}

pub async fn list_services(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.services.as_ref(), &pairs).await
}

pub async fn get_service(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.services.as_ref(), id).await
}

pub async fn create_service(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<ServiceDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let item = ServiceItem::create(owner.owner_id(), body, Utc::now())?;
    common::insert_record(&services, services.stores.services.as_ref(), item).await
}

pub async fn update_service(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ServicePatch>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let repo = services.stores.services.as_ref();
    let mut item = repo.require(owner.owner_id(), id).await?;
    item.apply_patch(body, Utc::now())?;
    common::update_record(&services, repo, item).await
}

pub async fn delete_service(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::delete_record(&services, owner.owner_id(), services.stores.services.as_ref(), id).await
}
