use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::Value;

use salonbook_core::{DomainError, OwnerId, RecordId};
use salonbook_infra::{ListQuery, Sort};
use salonbook_staff::{AttendanceRecord, AttendanceStatus, StaffDraft, StaffMember, StaffPatch};

use crate::app::dto::{self, CheckInRequest, JsonBody, OptionalJsonBody, QueryPairs};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "staff";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_staff).post(create_staff))
        .route("/:id", get(get_staff).patch(update_staff).delete(delete_staff))
        .route("/:id/attendance", get(staff_attendance))
        .route("/:id/attendance/check-in", post(check_in))
        .route("/:id/attendance/check-out", post(check_out))
}

/// The staff member, or a 404 when the owner has none with this id.
async fn require_staff(services: &AppServices, owner: OwnerId, id: RecordId) -> ApiResult<StaffMember> {
    services
        .stores
        .staff
        .get(owner, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("staff member {id} not found")))
}

pub async fn list_staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.staff.as_ref(), &pairs).await
}

pub async fn get_staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.staff.as_ref(), id).await
}

/// New members inherit the business's default commission rate unless one is given.
pub async fn create_staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<StaffDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let settings = services.stores.settings_for(owner.owner_id()).await?;
    let member = StaffMember::create(owner.owner_id(), body, settings.default_commission_bps, Utc::now())?;
    common::insert_record(&services, services.stores.staff.as_ref(), member).await
}

pub async fn update_staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StaffPatch>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let mut member = require_staff(&services, owner.owner_id(), id).await?;
    member.apply_patch(body, Utc::now())?;
    common::update_record(&services, services.stores.staff.as_ref(), member).await
}

pub async fn delete_staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::delete_record(&services, owner.owner_id(), services.stores.staff.as_ref(), id).await
}

pub async fn staff_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, "attendance")?;
    let id = dto::parse_id(&id)?;
    require_staff(&services, owner.owner_id(), id).await?;
    let pairs = common::scoped(pairs, "staff_id", id);
    common::list_records(&services, owner.owner_id(), services.stores.attendance.as_ref(), &pairs).await
}

/// Open today's attendance record. A second check-in on the same day is a 409.
pub async fn check_in(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    OptionalJsonBody(body): OptionalJsonBody<CheckInRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, "attendance")?;
    let id = dto::parse_id(&id)?;
    let member = require_staff(&services, owner.owner_id(), id).await?;
    if !member.active {
        return Err(DomainError::invariant(format!("staff member {} is inactive", member.name)).into());
    }

    let status = body.status.unwrap_or(AttendanceStatus::Present);
    let record = AttendanceRecord::check_in(owner.owner_id(), id, status, Utc::now())?;
    common::insert_record(&services, services.stores.attendance.as_ref(), record).await
}

/// Close the member's open attendance record: the newest one with a check-in
/// and no check-out, whatever its date.
pub async fn check_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, "attendance")?;
    let id = dto::parse_id(&id)?;
    require_staff(&services, owner.owner_id(), id).await?;

    let newest_first = ListQuery::new()
        .filter("staff_id", id.to_string())
        .sorted_by(Sort::parse("-date"));
    let mut record = services
        .stores
        .attendance
        .list_all(owner.owner_id(), &newest_first)
        .await?
        .into_iter()
        .find(|r| r.check_in.is_some() && r.check_out.is_none())
        .ok_or_else(|| ApiError::not_found("no open check-in for this staff member"))?;

    record.check_out(Utc::now())?;
    common::update_record(&services, services.stores.attendance.as_ref(), record).await
}
