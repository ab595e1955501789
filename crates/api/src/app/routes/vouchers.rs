use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};

use salonbook_infra::ListQuery;
use salonbook_loyalty::{Voucher, VoucherDraft, VoucherPatch, normalize_code};

use crate::app::dto::{self, JsonBody, QueryPairs, ValidateVoucherRequest};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "vouchers";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_vouchers).post(create_voucher))
        .route("/validate", post(validate_voucher))
        .route("/:id", get(get_voucher).patch(update_voucher).delete(delete_voucher))
}

pub async fn list_vouchers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.vouchers.as_ref(), &pairs).await
}

pub async fn get_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.vouchers.as_ref(), id).await
}

/// Codes are stored uppercase; a duplicate code for the same owner is a 409.
pub async fn create_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<VoucherDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let voucher = Voucher::create(owner.owner_id(), body, Utc::now())?;
    common::insert_record(&services, services.stores.vouchers.as_ref(), voucher).await
}

pub async fn update_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<VoucherPatch>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let repo = services.stores.vouchers.as_ref();
    let mut voucher = repo.require(owner.owner_id(), id).await?;
    voucher.apply_patch(body, Utc::now())?;
    common::update_record(&services, repo, voucher).await
}

pub async fn delete_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::delete_record(&services, owner.owner_id(), services.stores.vouchers.as_ref(), id).await
}

/// Preview the discount a code grants on an amount without redeeming it.
pub async fn validate_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<ValidateVoucherRequest>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let code = normalize_code(&body.code)?;
    let voucher = services
        .stores
        .vouchers
        .list(owner.owner_id(), &ListQuery::new().filter("code", code.clone()))
        .await?
        .items
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("voucher {code} not found")))?;

    let discount = voucher.discount_for(body.amount, Utc::now())?;
    Ok(Json(json!({
        "code": voucher.code,
        "kind": voucher.kind,
        "amount": body.amount,
        "discount": discount,
        "total": body.amount.saturating_sub(discount),
    })))
}
