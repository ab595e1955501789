use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Query,
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use serde_json::Value;

use salonbook_infra::workflows::{self, points};
use salonbook_loyalty::PointsAdjustment;

use crate::app::dto::{JsonBody, QueryPairs};
use crate::app::errors::ApiResult;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "points";

pub fn router() -> Router {
    Router::new().route("/", get(list_points).post(adjust_points))
}

pub async fn list_points(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.points.as_ref(), &pairs).await
}

/// Manual credit or debit. Overdrawing a customer's balance is a 422.
pub async fn adjust_points(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<PointsAdjustment>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let entry = workflows::adjust_points(&services.stores, owner.owner_id(), body, Utc::now()).await?;
    services.invalidate(owner.owner_id(), points::TOUCHES);
    common::created(&entry)
}
