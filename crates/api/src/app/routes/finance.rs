use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
};
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use salonbook_finance::{FinanceTransaction, TransactionDraft, TransactionPatch, summarize};
use salonbook_infra::{ListQuery, Record, resource_tag};

use crate::app::dto::{self, JsonBody, QueryPairs, QueryParams, SummaryParams};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

/// Permission scope for every finance route.
const SCOPE: &str = "finance";

pub fn router() -> Router {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/:id",
            get(get_transaction).patch(update_transaction).delete(delete_transaction),
        )
        .route("/summary", get(summary))
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, SCOPE)?;
    common::list_records(&services, owner.owner_id(), services.stores.finance.as_ref(), &pairs).await
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, SCOPE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.finance.as_ref(), id).await
}

pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<TransactionDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, SCOPE)?;
    let tx = FinanceTransaction::create(owner.owner_id(), body, Utc::now())?;
    common::insert_record(&services, services.stores.finance.as_ref(), tx).await
}

pub async fn update_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<TransactionPatch>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, SCOPE)?;
    let id = dto::parse_id(&id)?;
    let repo = services.stores.finance.as_ref();
    let mut tx = repo.require(owner.owner_id(), id).await?;
    tx.apply_patch(body, Utc::now())?;
    common::update_record(&services, repo, tx).await
}

pub async fn delete_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require_write(&owner, &principal, SCOPE)?;
    let id = dto::parse_id(&id)?;
    common::delete_record(&services, owner.owner_id(), services.stores.finance.as_ref(), id).await
}

fn day_start(date: Option<NaiveDate>) -> Option<chrono::DateTime<Utc>> {
    date.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|t| t.and_utc())
}

/// Income, expense, net and per-category totals for `from..=to`.
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(params): QueryParams<SummaryParams>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, SCOPE)?;
    let owner_id = owner.owner_id();
    let key = format!(
        "{}:summary?from={:?}&to={:?}",
        resource_tag(FinanceTransaction::RESOURCE, owner_id),
        params.from,
        params.to
    );
    let repo = services.stores.finance.as_ref();
    let value = services
        .cached(key, vec![resource_tag(FinanceTransaction::RESOURCE, owner_id)], || async move {
            // occurred_on compares as UTC midnight, so both bounds are day starts.
            let query = ListQuery::new().between(day_start(params.from), day_start(params.to));
            let transactions = repo.list_all(owner_id, &query).await?;
            let summary = summarize(&transactions, params.from, params.to)?;
            Ok::<_, ApiError>(dto::to_json(&summary)?)
        })
        .await?;
    Ok(Json(value))
}
