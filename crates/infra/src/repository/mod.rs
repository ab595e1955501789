//! Owner-scoped record storage.
//!
//! Every record lives in one table per resource and belongs to exactly one
//! owner. All reads and writes take the owner explicitly: a record owned by
//! someone else behaves exactly like a record that does not exist.

pub mod in_memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

use salonbook_core::{Entity, OwnerId, Owned, RecordId, Versioned};

pub use in_memory::InMemoryRepository;
pub use postgres::PgRepository;
pub use query::{Direction, FieldKind, ListQuery, Page, Pagination, Sort, TimeRange};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    /// Duplicate id or a unique field collision.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unknown filter/sort field or unsupported range.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database error: {0}")]
    Database(String),
}

/// A type stored through a [`Repository`].
///
/// Field names are keys of the record's JSON form. Only names listed here
/// ever reach a query. Identity and ownership come from [`Entity`] and
/// [`Owned`]; [`Versioned`] carries the optimistic concurrency token.
pub trait Record:
    Entity<Id = RecordId> + Owned + Versioned + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Table name and cache tag prefix.
    const RESOURCE: &'static str;
    const SEARCH_FIELDS: &'static [&'static str];
    const FILTER_FIELDS: &'static [&'static str];
    const SORT_FIELDS: &'static [(&'static str, FieldKind)];
    const DEFAULT_SORT: (&'static str, Direction);
    /// Field `from`/`to` bounds apply to.
    const RANGE_FIELD: Option<(&'static str, FieldKind)> = None;
    /// Field sets that must be unique per owner.
    const UNIQUE_FIELDS: &'static [&'static [&'static str]] = &[];
}

#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    async fn list(&self, owner: OwnerId, query: &ListQuery) -> Result<Page<R>, RepositoryError>;

    async fn get(&self, owner: OwnerId, id: RecordId) -> Result<Option<R>, RepositoryError>;

    /// Store a new record. Fails with `Conflict` on a duplicate id or unique field.
    async fn insert(&self, record: R) -> Result<R, RepositoryError>;

    /// Replace an existing record and bump its version.
    ///
    /// Fails with `NotFound` when the owner has no such record, and with
    /// `Conflict` when the stored version is not the one `record` was read at.
    async fn update(&self, record: R) -> Result<R, RepositoryError>;

    async fn delete(&self, owner: OwnerId, id: RecordId) -> Result<bool, RepositoryError>;

    /// Every record matching `query`, walking pages of the maximum size.
    async fn list_all(&self, owner: OwnerId, query: &ListQuery) -> Result<Vec<R>, RepositoryError> {
        let mut q = query.clone();
        q.pagination = Pagination::new(Some(Pagination::MAX_LIMIT), Some(0));
        let mut out = Vec::new();
        loop {
            let page = self.list(owner, &q).await?;
            let fetched = page.items.len() as u32;
            out.extend(page.items);
            if !page.has_more || fetched == 0 {
                return Ok(out);
            }
            q.pagination.offset += fetched;
        }
    }

    /// Fetch a record, turning absence into `NotFound`.
    async fn require(&self, owner: OwnerId, id: RecordId) -> Result<R, RepositoryError> {
        self.get(owner, id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl<R, S> Repository<R> for Arc<S>
where
    R: Record,
    S: Repository<R> + ?Sized,
{
    async fn list(&self, owner: OwnerId, query: &ListQuery) -> Result<Page<R>, RepositoryError> {
        (**self).list(owner, query).await
    }

    async fn get(&self, owner: OwnerId, id: RecordId) -> Result<Option<R>, RepositoryError> {
        (**self).get(owner, id).await
    }

    async fn insert(&self, record: R) -> Result<R, RepositoryError> {
        (**self).insert(record).await
    }

    async fn update(&self, record: R) -> Result<R, RepositoryError> {
        (**self).update(record).await
    }

    async fn delete(&self, owner: OwnerId, id: RecordId) -> Result<bool, RepositoryError> {
        (**self).delete(owner, id).await
    }
}

pub(crate) fn stale_version<R: Record>(id: RecordId, expected: u64) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "{} {id} was modified concurrently (expected version {expected})",
        R::RESOURCE
    ))
}

pub(crate) fn to_json<R: Record>(record: &R) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(record).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

pub(crate) fn from_json<R: Record>(value: serde_json::Value) -> Result<R, RepositoryError> {
    serde_json::from_value(value).map_err(|e| RepositoryError::Serialization(format!("{}: {e}", R::RESOURCE)))
}
