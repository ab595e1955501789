//! Postgres-backed repository.
//!
//! Each resource has a table `(id uuid, owner_id uuid, version bigint,
//! data jsonb, created_at, updated_at)`. Updates are conditional on the
//! version the record was read at. Queries are assembled with `QueryBuilder`:
//! table and field names come only from the record's static whitelists, and
//! every user-supplied value is a bound parameter.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | RepositoryError |
//! |------------|---------------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Database` |
//! | PoolClosed / other | n/a | `Database` |

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tokio::sync::Mutex;
use tracing::{Span, instrument};

use salonbook_core::{Entity, OwnerId, Owned, RecordId, Versioned};

use super::query::{Direction, FieldKind, ResolvedQuery};
use super::{ListQuery, Page, Record, Repository, RepositoryError, from_json, stale_version, to_json};

/// A transaction shared by every repository taking part in one unit of work.
/// `None` once committed.
pub type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// Where statements run: straight on the pool, or inside a shared transaction.
#[derive(Clone)]
pub enum PgBackend {
    Pool(Arc<PgPool>),
    Transaction(SharedTransaction),
}

fn finished_transaction() -> sqlx::Error {
    sqlx::Error::Protocol("transaction already finished".to_string())
}

impl PgBackend {
    async fn fetch_one(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<PgRow, sqlx::Error> {
        match self {
            Self::Pool(pool) => qb.build().fetch_one(pool.as_ref()).await,
            Self::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let conn = guard.as_mut().ok_or_else(finished_transaction)?;
                qb.build().fetch_one(&mut **conn).await
            }
        }
    }

    async fn fetch_all(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<Vec<PgRow>, sqlx::Error> {
        match self {
            Self::Pool(pool) => qb.build().fetch_all(pool.as_ref()).await,
            Self::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let conn = guard.as_mut().ok_or_else(finished_transaction)?;
                qb.build().fetch_all(&mut **conn).await
            }
        }
    }

    async fn fetch_optional(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<Option<PgRow>, sqlx::Error> {
        match self {
            Self::Pool(pool) => qb.build().fetch_optional(pool.as_ref()).await,
            Self::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let conn = guard.as_mut().ok_or_else(finished_transaction)?;
                qb.build().fetch_optional(&mut **conn).await
            }
        }
    }

    async fn execute(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<PgQueryResult, sqlx::Error> {
        match self {
            Self::Pool(pool) => qb.build().execute(pool.as_ref()).await,
            Self::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let conn = guard.as_mut().ok_or_else(finished_transaction)?;
                qb.build().execute(&mut **conn).await
            }
        }
    }
}

pub struct PgRepository<R> {
    backend: PgBackend,
    _record: PhantomData<fn() -> R>,
}

impl<R> PgRepository<R> {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self::with_backend(PgBackend::Pool(pool))
    }

    pub fn with_backend(backend: PgBackend) -> Self {
        Self {
            backend,
            _record: PhantomData,
        }
    }
}

impl<R> Clone for PgRepository<R> {
    fn clone(&self) -> Self {
        Self::with_backend(self.backend.clone())
    }
}

/// SQL expression reading `field` out of `data` with the right type.
fn field_expr(field: &'static str, kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => format!("lower(data->>'{field}')"),
        FieldKind::Numeric => format!("(data->>'{field}')::numeric"),
        FieldKind::Timestamp => format!("(data->>'{field}')::timestamptz"),
        FieldKind::Date => format!("((data->>'{field}') || 'T00:00:00Z')::timestamptz"),
    }
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_where<'a, R: Record>(qb: &mut QueryBuilder<'a, Postgres>, owner: OwnerId, q: &ResolvedQuery<'_>) {
    qb.push(" WHERE owner_id = ");
    qb.push_bind(*owner.as_uuid());

    if let Some(term) = q.search {
        if !R::SEARCH_FIELDS.is_empty() {
            let pattern = like_pattern(term);
            qb.push(" AND (");
            for (i, field) in R::SEARCH_FIELDS.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(format!("data->>'{field}' ILIKE "));
                qb.push_bind(pattern.clone());
            }
            qb.push(")");
        } else {
            qb.push(" AND FALSE");
        }
    }

    for (field, value) in &q.filters {
        qb.push(format!(" AND data->>'{field}' = "));
        qb.push_bind(value.to_string());
    }

    if let Some((field, kind, range)) = q.range {
        let expr = field_expr(field, kind);
        if let Some(from) = range.from {
            qb.push(format!(" AND {expr} >= "));
            qb.push_bind(from);
        }
        if let Some(to) = range.to {
            qb.push(format!(" AND {expr} <= "));
            qb.push_bind(to);
        }
    }
}

#[async_trait]
impl<R: Record> Repository<R> for PgRepository<R> {
    #[instrument(
        skip(self, query),
        fields(resource = R::RESOURCE, owner_id = %owner, row_count = tracing::field::Empty),
        err
    )]
    async fn list(&self, owner: OwnerId, query: &ListQuery) -> Result<Page<R>, RepositoryError> {
        let resolved = query.resolve::<R>()?;

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) AS total FROM {}", R::RESOURCE));
        push_where::<R>(&mut count, owner, &resolved);
        let row = self
            .backend
            .fetch_one(&mut count)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| RepositoryError::Database(format!("failed to read count: {e}")))?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT data FROM {}", R::RESOURCE));
        push_where::<R>(&mut select, owner, &resolved);
        let dir = match resolved.direction {
            Direction::Asc => "ASC NULLS LAST",
            Direction::Desc => "DESC NULLS FIRST",
        };
        select.push(format!(" ORDER BY {} {dir}, id ASC", field_expr(resolved.sort_field, resolved.sort_kind)));
        select.push(" LIMIT ");
        select.push_bind(resolved.pagination.limit as i64);
        select.push(" OFFSET ");
        select.push_bind(resolved.pagination.offset as i64);

        let rows = self
            .backend
            .fetch_all(&mut select)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let data: serde_json::Value = row
                .try_get("data")
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
            items.push(from_json(data)?);
        }

        Span::current().record("row_count", items.len());
        Ok(Page::new(items, total.max(0) as u64, resolved.pagination))
    }

    #[instrument(skip(self), fields(resource = R::RESOURCE, owner_id = %owner, id = %id), err)]
    async fn get(&self, owner: OwnerId, id: RecordId) -> Result<Option<R>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT data FROM {} WHERE owner_id = ", R::RESOURCE));
        qb.push_bind(*owner.as_uuid());
        qb.push(" AND id = ");
        qb.push_bind(*id.as_uuid());

        let row = self
            .backend
            .fetch_optional(&mut qb)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        match row {
            Some(row) => {
                let data: serde_json::Value = row
                    .try_get("data")
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
                Ok(Some(from_json(data)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(
        skip(self, record),
        fields(resource = R::RESOURCE, owner_id = %record.owner_id(), id = %record.id()),
        err
    )]
    async fn insert(&self, record: R) -> Result<R, RepositoryError> {
        let data = to_json(&record)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} (id, owner_id, version, data, created_at, updated_at) VALUES (",
            R::RESOURCE
        ));
        qb.push_bind(*record.id().as_uuid());
        qb.push(", ");
        qb.push_bind(*record.owner_id().as_uuid());
        qb.push(", ");
        qb.push_bind(record.version() as i64);
        qb.push(", ");
        qb.push_bind(data);
        qb.push(", now(), now())");

        self.backend
            .execute(&mut qb)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(record)
    }

    #[instrument(
        skip(self, record),
        fields(resource = R::RESOURCE, owner_id = %record.owner_id(), id = %record.id()),
        err
    )]
    async fn update(&self, mut record: R) -> Result<R, RepositoryError> {
        let expected = record.version();
        record.set_version(expected + 1);
        let data = to_json(&record)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET data = ", R::RESOURCE));
        qb.push_bind(data);
        qb.push(", version = ");
        qb.push_bind(record.version() as i64);
        qb.push(", updated_at = now() WHERE owner_id = ");
        qb.push_bind(*record.owner_id().as_uuid());
        qb.push(" AND id = ");
        qb.push_bind(*record.id().as_uuid());
        qb.push(" AND version = ");
        qb.push_bind(expected as i64);

        let result = self
            .backend
            .execute(&mut qb)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;
        if result.rows_affected() == 0 {
            return match self.get(record.owner_id(), *record.id()).await? {
                Some(_) => Err(stale_version::<R>(*record.id(), expected)),
                None => Err(RepositoryError::NotFound),
            };
        }
        Ok(record)
    }

    #[instrument(skip(self), fields(resource = R::RESOURCE, owner_id = %owner, id = %id), err)]
    async fn delete(&self, owner: OwnerId, id: RecordId) -> Result<bool, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM {} WHERE owner_id = ", R::RESOURCE));
        qb.push_bind(*owner.as_uuid());
        qb.push(" AND id = ");
        qb.push_bind(*id.as_uuid());

        let result = self
            .backend
            .execute(&mut qb)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Map SQLx errors to RepositoryError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => RepositoryError::Conflict(msg),
                _ => RepositoryError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => RepositoryError::Database(format!("connection pool closed in {operation}")),
        _ => RepositoryError::Database(format!("sqlx error in {operation}: {err}")),
    }
}
