//! Shared handler state: storage, the response cache and the session signer.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use salonbook_auth::{Hs256JwtValidator, JwtClaims, PrincipalId, Role};
use salonbook_core::{OwnerId, RecordId};
use salonbook_infra::{AppConfig, Stores, TagCache, record_tag, resource_tag};

use crate::app::errors::ApiResult;

pub struct AppServices {
    pub stores: Stores,
    pub cache: TagCache<Value>,
    pub jwt: Arc<Hs256JwtValidator>,
    pub session_ttl: chrono::Duration,
}

impl AppServices {
    pub fn new(config: &AppConfig, stores: Stores) -> Self {
        Self {
            stores,
            cache: TagCache::new(config.cache_ttl, config.cache_capacity),
            jwt: Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes())),
            session_ttl: config.session_ttl,
        }
    }

    /// Sign a session token for `sub` acting for `owner`.
    pub fn issue_session(&self, sub: PrincipalId, owner: OwnerId, roles: Vec<Role>) -> ApiResult<(String, JwtClaims)> {
        let claims = JwtClaims::new(sub, owner, roles, chrono::Utc::now(), self.session_ttl);
        let token = self.jwt.issue(&claims)?;
        Ok((token, claims))
    }

    /// Serve `key` from the cache, or run `load` and cache its result under `tags`.
    ///
    /// Errors are never cached.
    pub async fn cached<F, Fut>(&self, key: String, tags: Vec<String>, load: F) -> ApiResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>>,
    {
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(key, "cache hit");
            return Ok(hit);
        }
        let value = load().await?;
        self.cache.put(key, tags, value.clone());
        Ok(value)
    }

    /// Drop cached reads of every listed resource for `owner`.
    pub fn invalidate(&self, owner: OwnerId, resources: &[&str]) {
        for resource in resources {
            self.cache.invalidate_tag(&resource_tag(resource, owner));
        }
    }

    /// Drop cached reads of one record and of its resource's lists.
    pub fn invalidate_record(&self, resource: &str, owner: OwnerId, id: RecordId) {
        self.cache.invalidate_tag(&record_tag(resource, owner, id));
        self.cache.invalidate_tag(&resource_tag(resource, owner));
    }
}

#[cfg(test)]
mod tests {
    use salonbook_auth::JwtValidator;

    use super::*;

    fn services() -> AppServices {
        AppServices::new(&AppConfig::in_memory(), Stores::in_memory())
    }

    #[tokio::test]
    async fn cached_loads_once_until_invalidated() {
        let s = services();
        let owner = OwnerId::new();
        let key = "customers:x?".to_string();
        let tags = vec![resource_tag("customers", owner)];

        let first = s
            .cached(key.clone(), tags.clone(), || async { Ok(serde_json::json!(1)) })
            .await
            .unwrap();
        let second = s
            .cached(key.clone(), tags.clone(), || async { Ok(serde_json::json!(2)) })
            .await
            .unwrap();
        assert_eq!(first, second);

        s.invalidate(owner, &["customers"]);
        let third = s
            .cached(key, tags, || async { Ok(serde_json::json!(3)) })
            .await
            .unwrap();
        assert_eq!(third, serde_json::json!(3));
    }

    #[test]
    fn issued_sessions_validate() {
        let s = services();
        let owner = OwnerId::new();
        let (token, claims) = s.issue_session(PrincipalId::new(), owner, vec![Role::OWNER]).unwrap();
        let decoded = s.jwt.validate(&token, chrono::Utc::now()).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.owner_id, owner);
    }
}
