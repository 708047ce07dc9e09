//! FMIIS console daemon
//!
//! Wires the session, push channel, notification ledger, revalidator, and
//! route guard together and keeps them running until a shutdown signal.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use fmiis_api::{HttpStaffApi, StaffApi};
use fmiis_auth::SessionStore;
use fmiis_core::config::AppConfig;
use fmiis_core::error::AppError;
use fmiis_realtime::{ConsoleEngine, SocketIoConnector};
use fmiis_storage::StoreManager;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Console daemon error");
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay, and variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("FMIIS_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("FMIIS_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main daemon run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting FMIIS console v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Durable store ────────────────────────────────────
    tracing::info!(provider = %config.storage.provider, "Initializing durable store...");
    let store = StoreManager::new(&config.storage)?.provider();

    // ── Step 2: Session ──────────────────────────────────────────
    let session = Arc::new(SessionStore::new(store, &config.session));

    // ── Step 3: Transports ───────────────────────────────────────
    let api: Arc<dyn StaffApi> = Arc::new(HttpStaffApi::new(&config.api)?);
    let connector = Arc::new(SocketIoConnector::new());
    if config.push.endpoint.is_none() {
        tracing::warn!("No push endpoint configured; notifications refresh only on demand");
    }

    // ── Step 4: Engine ───────────────────────────────────────────
    let engine = ConsoleEngine::new(&config, api, connector, session.clone());
    engine.start();

    session.rehydrate();

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping console engine...");
    engine.shutdown().await;

    tracing::info!("FMIIS console shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
