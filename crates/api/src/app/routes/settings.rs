use std::sync::Arc;

use axum::{Extension, Json, Router, routing::get};
use chrono::Utc;
use serde_json::Value;

use salonbook_core::RecordId;
use salonbook_infra::{record_tag, resource_tag};
use salonbook_settings::SettingsUpdate;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::{OwnerContext, PrincipalContext};

const RESOURCE: &str = "settings";

pub fn router() -> Router {
    Router::new().route("/", get(get_settings).put(put_settings))
}

/// The owner's settings; defaults until the first save.
pub async fn get_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Value>> {
    authz::require_read(&owner, &principal, RESOURCE)?;
    let owner_id = owner.owner_id();
    let id = RecordId::singleton_for(owner_id);
    let tags = vec![resource_tag(RESOURCE, owner_id), record_tag(RESOURCE, owner_id, id)];
    let stores = &services.stores;
    let value = services
        .cached(dto::record_cache_key(RESOURCE, owner_id, id), tags, || async move {
            let settings = stores.settings_for(owner_id).await?;
            dto::to_json(&settings)
        })
        .await?;
    Ok(Json(value))
}

/// Partial update; omitted fields keep their current value.
pub async fn put_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<SettingsUpdate>,
) -> ApiResult<Json<Value>> {
    authz::require_write(&owner, &principal, RESOURCE)?;
    let owner_id = owner.owner_id();
    let mut settings = services.stores.settings_for(owner_id).await?;
    settings.apply_update(body, Utc::now())?;
    let saved = services.stores.save_settings(settings).await?;
    services.invalidate_record(RESOURCE, owner_id, saved.id);
    Ok(Json(dto::to_json(&saved)?))
}
