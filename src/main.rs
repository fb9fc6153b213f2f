//! Hostel Laundry Server
//!
//! Booking, waitlist and admin control plane for hostel laundry rooms.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use hostel_laundry_server::{
    api,
    clock::SystemClock,
    config::{AppConfig, StorageBackend},
    logging,
    repository::{LaundryStore, MemoryRepository, PgRepository},
    services::notifications,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    tracing::info!("Starting Hostel Laundry Server v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn LaundryStore> = match config.database.backend {
        StorageBackend::Postgres => Arc::new(
            PgRepository::connect(&config.database)
                .await
                .context("Failed to set up database")?,
        ),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let notifier = notifications::from_config(&config.notifications)
        .context("Failed to set up notifications")?;

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState::new(config, store, notifier, Arc::new(SystemClock))
        .context("Failed to create services")?;

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
