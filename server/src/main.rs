//! Server binary: reads settings, prepares the store and serves the API.
//!
//! Run from repo root: `cargo run -p newsroom-server`

use newsroom_api::{app, ensure_database_exists, ensure_tables, AppState, MemoryStore, PgStore, Settings, StorageBackend};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&settings.log_filter)?)
        .init();

    let state = match settings.storage {
        StorageBackend::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(&settings.database_url)
                .await?;
            ensure_tables(&pool).await?;
            AppState::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on restart");
            AppState::new(MemoryStore::new())
        }
    };

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state, settings.max_body_bytes)).await?;
    Ok(())
}
