use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job_board::{
    config::Config,
    routes::build_app,
    store::{postgres::create_pool, MemoryStore, PgStore, Store},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "job_board=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url, config.database_max_connections)
                .await
                .context("failed to connect to the database")?;
            let store = PgStore::new(pool);
            store.migrate().await.context("failed to run migrations")?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping all data in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let app = build_app(AppState::new(store, &config), &config)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
