use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use serde_json::Value;

use salonbook_core::DomainError;
use salonbook_staff::{AttendanceDraft, AttendancePatch, AttendanceRecord};

use crate::app::dto::{self, JsonBody, QueryPairs};
use crate::app::errors::ApiResult;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "attendance";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_attendance).post(create_attendance))
        .route(
            "/:id",
            get(get_attendance).patch(update_attendance).delete(delete_attendance),
        )
}

pub async fn list_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.attendance.as_ref(), &pairs).await
}

pub async fn get_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.attendance.as_ref(), id).await
}

/// Record a day manually (e.g. leave or a forgotten check-in). One record per
/// staff member per date.
pub async fn create_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<AttendanceDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    if services.stores.staff.get(owner.owner_id(), body.staff_id).await?.is_none() {
        return Err(DomainError::validation(format!("staff member {} does not exist", body.staff_id)).into());
    }
    let record = AttendanceRecord::create(owner.owner_id(), body, Utc::now())?;
    common::insert_record(&services, services.stores.attendance.as_ref(), record).await
}

pub async fn update_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AttendancePatch>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let repo = services.stores.attendance.as_ref();
    let mut record = repo.require(owner.owner_id(), id).await?;
    record.apply_patch(body, Utc::now())?;
    common::update_record(&services, repo, record).await
}

pub async fn delete_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::delete_record(&services, owner.owner_id(), services.stores.attendance.as_ref(), id).await
}
