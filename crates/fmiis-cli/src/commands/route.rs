//! Route guard CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fmiis_auth::guard::machine::{GuardInput, decide};
use fmiis_auth::guard::policies::{home_path, notifications_path, send_notification_path};
use fmiis_core::config::AppConfig;
use fmiis_core::error::AppError;
use fmiis_entity::{Identity, Role};

use super::Console;

/// Arguments for route commands
#[derive(Debug, Args)]
pub struct RouteArgs {
    /// Route subcommand
    #[command(subcommand)]
    pub command: RouteCommand,
}

/// Route subcommands
#[derive(Debug, Subcommand)]
pub enum RouteCommand {
    /// Decide whether a path is reachable
    Check {
        /// Path to check, e.g. `/hr/notifications`
        path: String,
        /// Evaluate for this role instead of the stored session
        #[arg(short, long)]
        role: Option<Role>,
    },
    /// List the landing paths of every role
    Homes,
}

/// Decision display
#[derive(Debug, Serialize)]
struct DecisionView {
    path: String,
    state: String,
    status: String,
    target: Option<String>,
}

/// Role landing row
#[derive(Debug, Serialize, Tabled)]
struct HomeRow {
    /// Role
    role: String,
    /// Home
    home: String,
    /// Notifications
    notifications: String,
    /// Send form
    send: String,
}

/// Execute route commands
pub async fn execute(
    args: &RouteArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        RouteCommand::Check { path, role } => {
            let stored = Console::open(config)?.session.current();
            let identity = match (role, stored) {
                (Some(role), Some(identity)) => Some(Identity {
                    role: *role,
                    ..identity
                }),
                (Some(role), None) => Some(Identity {
                    id: String::new(),
                    display_name: String::new(),
                    email: String::new(),
                    role: *role,
                    avatar_ref: None,
                }),
                (None, stored) => stored,
            };

            let (state, decision) = decide(&GuardInput {
                identity: identity.as_ref(),
                path,
                rehydrated: true,
                checking: false,
            });
            let view = DecisionView {
                path: path.clone(),
                state: state.to_string(),
                status: format!("{:?}", decision.status).to_lowercase(),
                target: decision.target.clone(),
            };
            output::print_item(&view, format, || {
                output::print_kv("Path", &view.path);
                output::print_kv("State", &view.state);
                output::print_kv("Decision", &view.status);
                if let Some(target) = &view.target {
                    output::print_kv("Redirect", target);
                }
            });
        }
        RouteCommand::Homes => {
            let rows: Vec<HomeRow> = Role::ALL
                .into_iter()
                .map(|role| HomeRow {
                    role: role.to_string(),
                    home: home_path(role),
                    notifications: notifications_path(role),
                    send: if role.can_send_notifications() {
                        send_notification_path(role)
                    } else {
                        "-".to_string()
                    },
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
