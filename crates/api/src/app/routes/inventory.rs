use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};

use salonbook_infra::workflows::{self, stock};
use salonbook_infra::{ListQuery, resource_tag};
use salonbook_inventory::{StockAdjustment, StockItem, StockItemDraft, StockItemPatch};

use crate::app::dto::{self, JsonBody, QueryPairs};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "inventory";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_item).patch(update_item).delete(delete_item))
        .route("/:id/adjust", post(adjust_item))
        .route("/:id/movements", get(item_movements))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    common::list_records(&services, owner.owner_id(), services.stores.inventory.as_ref(), &pairs).await
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::get_record(&services, owner.owner_id(), services.stores.inventory.as_ref(), id).await
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<StockItemDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let item = StockItem::create(owner.owner_id(), body, Utc::now())?;
    common::insert_record(&services, services.stores.inventory.as_ref(), item).await
}

/// Edit item details. Quantity only changes through `/adjust`.
pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StockItemPatch>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let repo = services.stores.inventory.as_ref();
    let mut item = repo.require(owner.owner_id(), id).await?;
    item.apply_patch(body, Utc::now())?;
    common::update_record(&services, repo, item).await
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    common::delete_record(&services, owner.owner_id(), services.stores.inventory.as_ref(), id).await
}

pub async fn adjust_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StockAdjustment>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    let (item, movement) = workflows::adjust_stock(&services.stores, owner.owner_id(), id, body, Utc::now()).await?;
    services.invalidate_record(RESOURCE, owner.owner_id(), id);
    services.invalidate(owner.owner_id(), stock::TOUCHES);
    Ok(Json(json!({
        "item": dto::to_json(&item)?,
        "movement": dto::to_json(&movement)?,
        "low_stock": item.is_low_stock(),
    })))
}

pub async fn item_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let id = dto::parse_id(&id)?;
    services.stores.inventory.require(owner.owner_id(), id).await?;
    let pairs = common::scoped(pairs, "item_id", id);
    common::list_records(&services, owner.owner_id(), services.stores.stock_movements.as_ref(), &pairs).await
}

/// Items at or below their reorder level, lowest quantity first.
pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let owner_id = owner.owner_id();
    let key = format!("{}:low-stock", resource_tag(RESOURCE, owner_id));
    let repo = services.stores.inventory.as_ref();
    let value = services
        .cached(key, vec![resource_tag(RESOURCE, owner_id)], || async move {
            let mut items: Vec<StockItem> = repo
                .list_all(owner_id, &ListQuery::new())
                .await?
                .into_iter()
                .filter(StockItem::is_low_stock)
                .collect();
            items.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));
            Ok::<_, ApiError>(json!({ "items": dto::to_json(&items)? }))
        })
        .await?;
    Ok(Json(value))
}
