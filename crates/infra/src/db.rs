//! Postgres connection pool and schema setup.

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::repository::RepositoryError;
use crate::repository::postgres::map_sqlx_error;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

pub async fn connect(url: &str, max_connections: u32) -> Result<Arc<PgPool>, RepositoryError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;
    Ok(Arc::new(pool))
}

/// Apply the schema. Every statement is idempotent.
#[tracing::instrument(skip(pool), err)]
pub async fn migrate(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    tracing::info!("database schema applied");
    Ok(())
}
