//! Koha Sync Server binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use koha_sync_server::build_router;
use koha_sync_server::config::{Config, StoreBackend};
use koha_sync_server::state::AppState;
use koha_sync_server::storage::{MemoryStore, S3Client, S3Store, SqliteStore, SyncStore};
use koha_sync_server::sync::SyncService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "koha_sync_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    // A misconfigured store backend is fatal
    let config = Config::from_env().map_err(|e| {
        tracing::error!("Invalid sync store configuration: {}", e);
        e
    })?;

    tracing::info!("Starting Koha Sync Server v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config).await?;
    tracing::info!(
        "Sync store: {} (namespace {})",
        store.backend(),
        config.sync.namespace
    );

    let app_state = AppState::new(config.clone(), SyncService::new(store));
    let app = build_router(app_state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid SERVER_HOST/SERVER_PORT")?;
    tracing::info!("Koha Sync Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SyncStore>> {
    let namespace = &config.sync.namespace;
    let store: Arc<dyn SyncStore> = match config.sync.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; records are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Sqlite => {
            let store = SqliteStore::connect(&config.database.url, namespace)
                .await
                .context("failed to open SQLite store")?;
            tracing::info!("Database initialized at {}", config.database.url);
            Arc::new(store)
        }
        StoreBackend::S3 => {
            let storage = config
                .storage
                .as_ref()
                .context("S3 backend selected without storage settings")?;
            tracing::info!("S3 endpoint: {}", storage.endpoint);
            let client = S3Client::new(storage)
                .await
                .context("failed to initialize S3 client")?;
            Arc::new(S3Store::new(client, namespace))
        }
    };
    Ok(store)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
