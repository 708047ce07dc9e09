//! Session CLI commands.

use clap::{Args, Subcommand};
use dialoguer::Password;
use serde::Serialize;

use crate::output::{self, OutputFormat};
use fmiis_auth::guard::policies::home_path;
use fmiis_auth::{ProbeOutcome, SessionManager, SessionRevalidator};
use fmiis_core::config::AppConfig;
use fmiis_core::error::AppError;
use fmiis_entity::Identity;

use super::Console;

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Sign in and persist the identity
    Login {
        /// Login email
        email: String,
        /// Password; prompted for when omitted
        #[arg(long, env = "FMIIS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and clear the persisted identity
    Logout,
    /// Show the persisted identity
    Whoami,
    /// Confirm the persisted identity with the backend
    Revalidate,
}

/// Identity display for JSON output
#[derive(Debug, Serialize)]
struct IdentityView<'a> {
    id: &'a str,
    name: &'a str,
    email: &'a str,
    role: String,
    section: String,
    home: String,
}

impl<'a> From<&'a Identity> for IdentityView<'a> {
    fn from(identity: &'a Identity) -> Self {
        Self {
            id: &identity.id,
            name: &identity.display_name,
            email: &identity.email,
            role: identity.role.to_string(),
            section: identity.section().to_string(),
            home: home_path(identity.role),
        }
    }
}

fn print_identity(identity: &Identity, format: OutputFormat) {
    let view = IdentityView::from(identity);
    output::print_item(&view, format, || {
        output::print_kv("Name", view.name);
        output::print_kv("Email", view.email);
        output::print_kv("Role", &view.role);
        output::print_kv("Section", &view.section);
        output::print_kv("Home", &view.home);
    });
}

/// Execute session commands
pub async fn execute(
    args: &SessionArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let console = Console::open(config)?;
    let manager = SessionManager::new(console.api.clone(), console.session.clone());

    match &args.command {
        SessionCommand::Login { email, password } => {
            let password = match password {
                Some(password) => password.clone(),
                None => Password::new()
                    .with_prompt(format!("Password for {email}"))
                    .interact()
                    .map_err(|e| AppError::internal(format!("Prompt failed: {e}")))?,
            };
            let identity = manager.login(email, &password).await?;
            output::print_success(&format!(
                "Signed in as {} ({})",
                identity.display_name, identity.role
            ));
            print_identity(&identity, format);
        }
        SessionCommand::Logout => {
            if console.session.current().is_none() {
                output::print_warning("No stored session");
                return Ok(());
            }
            manager.logout().await;
            output::print_success("Signed out");
        }
        SessionCommand::Whoami => {
            let identity = console.require_identity()?;
            print_identity(&identity, format);
        }
        SessionCommand::Revalidate => {
            let revalidator = SessionRevalidator::new(
                console.api.clone(),
                console.session.clone(),
                config.session.clone(),
            );
            match revalidator.revalidate().await {
                ProbeOutcome::Skipped => output::print_warning("No stored session"),
                ProbeOutcome::Confirmed => output::print_success("Session confirmed"),
                ProbeOutcome::Reconciled => {
                    output::print_success("Session confirmed; profile updated");
                    if let Some(identity) = console.session.current() {
                        print_identity(&identity, format);
                    }
                }
                ProbeOutcome::Stale => output::print_warning("Session changed during the check"),
                ProbeOutcome::Failed(e) => return Err(e),
            }
        }
    }

    Ok(())
}
