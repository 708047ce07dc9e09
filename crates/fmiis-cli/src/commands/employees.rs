//! Employee directory CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fmiis_core::config::AppConfig;
use fmiis_core::error::AppError;
use fmiis_entity::Section;

use super::Console;

/// Arguments for employee commands
#[derive(Debug, Args)]
pub struct EmployeeArgs {
    /// Employee subcommand
    #[command(subcommand)]
    pub command: EmployeeCommand,
}

/// Employee subcommands
#[derive(Debug, Subcommand)]
pub enum EmployeeCommand {
    /// List employees
    List {
        /// Filter by section
        #[arg(short, long)]
        section: Option<Section>,
    },
}

/// Employee display row
#[derive(Debug, Serialize, Tabled)]
struct EmployeeRow {
    /// Employee ID
    id: String,
    /// Name
    name: String,
    /// Email
    email: String,
    /// Role
    role: String,
    /// Section
    section: String,
}

/// Execute employee commands
pub async fn execute(
    args: &EmployeeArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let console = Console::open(config)?;

    match &args.command {
        EmployeeCommand::List { section } => {
            let employees = console.api.employees().await?;
            let rows: Vec<EmployeeRow> = employees
                .iter()
                .filter(|e| section.is_none_or(|s| s.contains(e.role)))
                .map(|e| EmployeeRow {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    email: e.email.clone(),
                    role: e.role.to_string(),
                    section: Section::for_role(e.role).to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
