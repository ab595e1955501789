use std::sync::Arc;

use anyhow::Context;

use salonbook_api::app::{AppServices, build_app};
use salonbook_infra::{AppConfig, Stores, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    salonbook_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let stores = match &config.database_url {
        Some(url) => {
            let pool = db::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to Postgres")?;
            db::migrate(&pool).await.context("failed to apply migrations")?;
            tracing::info!("using Postgres storage");
            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; data lives in memory and is lost on exit");
            Stores::in_memory()
        }
    };

    let services = Arc::new(AppServices::new(&config, stores));
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
