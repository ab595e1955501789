use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::Value;

use salonbook_appointments::{AppointmentDraft, AppointmentPatch};
use salonbook_infra::workflows::{self, booking, checkout};

use crate::app::dto::{self, CancelRequest, JsonBody, OptionalJsonBody, QueryPairs};
use crate::app::errors::ApiResult;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "appointments";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route(
            "/:id",
            get(get_appointment).patch(update_appointment).delete(delete_appointment),
        )
        .route("/:id/complete", post(complete_appointment))
        .route("/:id/cancel", post(cancel_appointment))
        .route("/:id/no-show", post(mark_no_show))
}

pub async fn list_appointments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.appointments.as_ref(), &pairs).await
}

pub async fn get_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.appointments.as_ref(), id).await
}

/// Book: resolves services, checks the customer/staff references and the
/// staff member's calendar (409 on overlap).
pub async fn create_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<AppointmentDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let appt = workflows::book_appointment(&services.stores, owner.owner_id(), body, Utc::now()).await?;
    services.invalidate(owner.owner_id(), booking::TOUCHES);
    common::created(&appt)
}

pub async fn update_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AppointmentPatch>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let appt = workflows::reschedule_appointment(&services.stores, owner.owner_id(), id, body, Utc::now()).await?;
    services.invalidate(owner.owner_id(), booking::TOUCHES);
    common::ok(&appt)
}

pub async fn delete_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::delete_record(&services, owner.owner_id(), services.stores.appointments.as_ref(), id).await
}

/// Checkout: voucher, completion, income, customer stats and points in one go.
pub async fn complete_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let receipt = workflows::complete_appointment(&services.stores, owner.owner_id(), id, Utc::now()).await?;
    services.invalidate(owner.owner_id(), checkout::TOUCHES);
    common::ok(&receipt)
}

pub async fn cancel_appointment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    OptionalJsonBody(body): OptionalJsonBody<CancelRequest>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let reason = body.reason;
    let repo = services.stores.appointments.as_ref();
    let mut appt = repo.require(owner.owner_id(), id).await?;
    appt.cancel(reason, Utc::now())?;
    common::update_record(&services, repo, appt).await
}

pub async fn mark_no_show(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let repo = services.stores.appointments.as_ref();
    let mut appt = repo.require(owner.owner_id(), id).await?;
    appt.mark_no_show(Utc::now())?;
    common::update_record(&services, repo, appt).await
}
