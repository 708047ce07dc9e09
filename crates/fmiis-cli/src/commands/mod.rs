//! CLI command definitions and dispatch.

pub mod employees;
pub mod notifications;
pub mod route;
pub mod session;
pub mod watch;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use fmiis_api::{HttpStaffApi, StaffApi};
use fmiis_auth::SessionStore;
use fmiis_core::config::AppConfig;
use fmiis_core::error::AppError;
use fmiis_entity::Identity;
use fmiis_storage::StoreManager;

/// FMIIS staff console
#[derive(Debug, Parser)]
#[command(name = "fmiis", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "FMIIS_CONFIG", default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay (`config/{env}.toml`)
    #[arg(short, long, env = "FMIIS_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in, sign out, and inspect the stored session
    Session(session::SessionArgs),
    /// Read, acknowledge, and send notifications
    Notifications(notifications::NotificationArgs),
    /// Employee directory
    Employees(employees::EmployeeArgs),
    /// Route guard decisions
    Route(route::RouteArgs),
    /// Run the console engine and stream its activity
    Watch(watch::WatchArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.config, &self.env)?;
        match &self.command {
            Commands::Session(args) => session::execute(args, &config, self.format).await,
            Commands::Notifications(args) => {
                notifications::execute(args, &config, self.format).await
            }
            Commands::Employees(args) => employees::execute(args, &config, self.format).await,
            Commands::Route(args) => route::execute(args, &config, self.format).await,
            Commands::Watch(args) => watch::execute(args, &config).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str, env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path, env)
}

/// The pieces every command needs: the rehydrated session and the API.
#[derive(Debug)]
pub struct Console {
    /// Canonical session, rehydrated from the durable store.
    pub session: Arc<SessionStore>,
    /// Backend client.
    pub api: Arc<dyn StaffApi>,
}

impl Console {
    /// Opens the configured store, rehydrates the session, and builds the client.
    pub fn open(config: &AppConfig) -> Result<Self, AppError> {
        let store = StoreManager::new(&config.storage)?.provider();
        let session = Arc::new(SessionStore::new(store, &config.session));
        session.rehydrate();
        let api: Arc<dyn StaffApi> = Arc::new(HttpStaffApi::new(&config.api)?);
        Ok(Self { session, api })
    }

    /// The signed-in identity, or an authentication error.
    pub fn require_identity(&self) -> Result<Identity, AppError> {
        self.session
            .current()
            .ok_or_else(|| AppError::authentication("Not signed in. Run `fmiis session login` first"))
    }
}
