use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use serde_json::Value;

use salonbook_customers::{Customer, CustomerDraft, CustomerPatch};

use crate::app::dto::{self, JsonBody, QueryPairs};
use crate::app::errors::ApiResult;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "customers";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/:id", get(get_customer).patch(update_customer).delete(delete_customer))
        .route("/:id/points", get(customer_points))
        .route("/:id/appointments", get(customer_appointments))
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.customers.as_ref(), &pairs).await
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.customers.as_ref(), id).await
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<CustomerDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let customer = Customer::create(owner.owner_id(), body, Utc::now())?;
    common::insert_record(&services, services.stores.customers.as_ref(), customer).await
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<CustomerPatch>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let repo = services.stores.customers.as_ref();
    let mut customer = repo.require(owner.owner_id(), id).await?;
    customer.apply_patch(body, Utc::now())?;
    common::update_record(&services, repo, customer).await
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::delete_record(&services, owner.owner_id(), services.stores.customers.as_ref(), id).await
}

/// The customer's points ledger, newest first.
pub async fn customer_points(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, "points")?;
    let id = dto::parse_id(&id)?;
    services.stores.customers.require(owner.owner_id(), id).await?;
    let pairs = common::scoped(pairs, "customer_id", id);
    common::list_records(&services, owner.owner_id(), services.stores.points.as_ref(), &pairs).await
}

pub async fn customer_appointments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, "appointments")?;
    let id = dto::parse_id(&id)?;
    services.stores.customers.require(owner.owner_id(), id).await?;
    let pairs = common::scoped(pairs, "customer_id", id);
    common::list_records(&services, owner.owner_id(), services.stores.appointments.as_ref(), &pairs).await
}
