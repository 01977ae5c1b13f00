use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use apartment_manager_api::app::{create_app, AppState, Repositories};
use apartment_manager_api::config::{Config, StoreBackend};
use apartment_manager_api::jobs::TelegramUpdateListener;
use apartment_manager_api::middleware::{init_metrics, logging::init_logging};
use apartment_manager_api::services::{TelegramClient, TelegramNotifier};
use domain::ports::Notifier;
use domain::services::LogNotifier;
use domain::store::{AtomicStore, MemoryStore};
use persistence::RedisStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("loading configuration")?;

    init_logging(&config.logging);
    init_metrics().context("installing Prometheus recorder")?;

    info!("Starting Apartment Manager API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.to_pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let store: Arc<dyn AtomicStore> = match config.store.backend {
        StoreBackend::Redis => Arc::new(
            RedisStore::connect(&config.redis.url)
                .await
                .context("connecting to Redis")?,
        ),
        StoreBackend::Memory => {
            info!("Using in-process store; invitations and payment markers are not shared");
            Arc::new(MemoryStore::new())
        }
    };

    let repos = Repositories::postgres(&pool);

    let telegram = if config.telegram.enabled {
        Some(TelegramClient::new(&config.telegram)?)
    } else {
        None
    };
    let notifier: Arc<dyn Notifier> = match &telegram {
        Some(client) => Arc::new(TelegramNotifier::new(client.clone(), repos.users.clone())),
        None => {
            info!("Telegram disabled; notifications are logged only");
            Arc::new(LogNotifier)
        }
    };

    let addr = config.socket_addr()?;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let poll_timeout = config.telegram.poll_timeout_secs;

    let state = AppState::new(config, repos, store, notifier, Some(pool))?;

    let mut listener_job = telegram.map(|client| {
        let mut job = TelegramUpdateListener::new(client, state.users.clone(), poll_timeout);
        job.start();
        job
    });

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(job) = listener_job.take() {
        job.shutdown();
        job.wait_for_shutdown(shutdown_timeout).await;
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
