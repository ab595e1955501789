//! Login account storage.
//!
//! Accounts are looked up by email before any owner is known, so they live
//! outside the owner-scoped [`crate::repository::Repository`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use salonbook_auth::Account;
use salonbook_core::UserId;

use crate::repository::RepositoryError;
use crate::repository::postgres::map_sqlx_error;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError>;
    async fn get(&self, id: UserId) -> Result<Option<Account>, RepositoryError>;
    /// Fails with `Conflict` when the email is taken.
    async fn insert(&self, account: Account) -> Result<Account, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<HashMap<UserId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Database("account store lock poisoned".to_string())
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|a| a.email == email).cloned())
    }

    async fn get(&self, id: UserId) -> Result<Option<Account>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn insert(&self, account: Account) -> Result<Account, RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.values().any(|a| a.email == account.email) {
            return Err(RepositoryError::Conflict(format!("email {} is already registered", account.email)));
        }
        map.insert(account.id, account.clone());
        Ok(account)
    }
}

pub struct PgAccountStore {
    pool: Arc<PgPool>,
}

impl PgAccountStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn decode(row: &sqlx::postgres::PgRow) -> Result<Account, RepositoryError> {
    let data: serde_json::Value = row
        .try_get("data")
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    serde_json::from_value(data).map_err(|e| RepositoryError::Serialization(format!("accounts: {e}")))
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query("SELECT data FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_account_by_email", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn get(&self, id: UserId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query("SELECT data FROM accounts WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_account", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, account), fields(account_id = %account.id, owner_id = %account.owner_id), err)]
    async fn insert(&self, account: Account) -> Result<Account, RepositoryError> {
        let data = serde_json::to_value(&account).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO accounts (id, owner_id, email, data, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*account.id.as_uuid())
        .bind(*account.owner_id.as_uuid())
        .bind(&account.email)
        .bind(data)
        .bind(account.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| match map_sqlx_error("insert_account", e) {
            RepositoryError::Conflict(_) => {
                RepositoryError::Conflict(format!("email {} is already registered", account.email))
            }
            other => other,
        })?;
        Ok(account)
    }
}
