use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};

use salonbook_infra::workflows::{self, PayrollRunRequest, payroll};

use crate::app::dto::{self, JsonBody, QueryPairs};
use crate::app::errors::ApiResult;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "payroll";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_payroll))
        .route("/run", post(run_payroll))
        .route("/:id", get(get_payroll))
}

pub async fn list_payroll(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.payroll.as_ref(), &pairs).await
}

pub async fn get_payroll(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.payroll.as_ref(), id).await
}

/// Compute and persist payroll for a period; re-running a paid period is a 409.
pub async fn run_payroll(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<PayrollRunRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let records = workflows::run_payroll(&services.stores, owner.owner_id(), body, Utc::now()).await?;
    services.invalidate(owner.owner_id(), payroll::TOUCHES);
    let items = dto::to_json(&records)?;
    Ok((StatusCode::CREATED, Json(json!({ "items": items }))))
}
