//! Notification CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use fmiis_core::config::AppConfig;
use fmiis_core::error::AppError;
use fmiis_entity::{Notification, NotificationType, Section};
use fmiis_realtime::notification::composer::template_for;
use fmiis_realtime::{AckState, NotificationComposer, NotificationLedger, ReceiverTarget};

use super::Console;

/// Arguments for notification commands
#[derive(Debug, Args)]
pub struct NotificationArgs {
    /// Notification subcommand
    #[command(subcommand)]
    pub command: NotificationCommand,
}

/// Notification subcommands
#[derive(Debug, Subcommand)]
pub enum NotificationCommand {
    /// List notifications addressed to the signed-in user
    List {
        /// Only unseen notifications
        #[arg(short, long)]
        unseen: bool,
    },
    /// Show one notification and mark it seen
    Show {
        /// Notification ID
        id: String,
        /// Do not acknowledge the read
        #[arg(long)]
        no_ack: bool,
    },
    /// Mark a notification seen
    Seen {
        /// Notification ID
        id: String,
    },
    /// Send a notification to a section or one employee
    Send {
        /// Notification type, e.g. `general` or `emergency-meeting`
        #[arg(short = 't', long = "type")]
        kind: NotificationType,
        /// Receiving section
        #[arg(short, long, conflicts_with = "employee", required_unless_present = "employee")]
        section: Option<Section>,
        /// Receiving employee ID
        #[arg(long)]
        employee: Option<String>,
        /// Body text; defaults to the type's template
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Print the default content of every notification type
    Templates,
}

/// Notification display row
#[derive(Debug, Serialize, Tabled)]
struct NotificationRow {
    /// Notification ID
    id: String,
    /// Type
    #[tabled(rename = "type")]
    kind: String,
    /// Sender
    sender: String,
    /// Preview
    content: String,
    /// Seen by me
    seen: String,
    /// Created
    created: String,
}

impl NotificationRow {
    fn new(notification: &Notification, email: &str) -> Self {
        Self {
            id: notification.id.clone(),
            kind: notification.kind.to_string(),
            sender: notification.sender.name.clone(),
            content: notification.preview(8),
            seen: if notification.is_unseen_by(email) { "no" } else { "yes" }.to_string(),
            created: notification.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Template display row
#[derive(Debug, Serialize, Tabled)]
struct TemplateRow {
    /// Type
    #[tabled(rename = "type")]
    kind: String,
    /// Default content
    content: String,
}

/// Execute notification commands
pub async fn execute(
    args: &NotificationArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    if let NotificationCommand::Templates = &args.command {
        let rows: Vec<TemplateRow> = NotificationType::ALL
            .into_iter()
            .map(|kind| TemplateRow {
                kind: kind.to_string(),
                content: template_for(kind).to_string(),
            })
            .collect();
        output::print_list(&rows, format);
        return Ok(());
    }

    let console = Console::open(config)?;
    let identity = console.require_identity()?;

    if let NotificationCommand::Send {
        kind,
        section,
        employee,
        content,
    } = &args.command
    {
        let target = match (section, employee) {
            (Some(section), _) => ReceiverTarget::Section(*section),
            (None, Some(id)) => ReceiverTarget::Employee(id.clone()),
            (None, None) => return Err(AppError::validation("Please select receivers")),
        };
        let composer = NotificationComposer::new(console.api.clone());
        let created = composer
            .send(&identity, *kind, &target, content.as_deref())
            .await?;
        output::print_success(&format!(
            "Sent {} to {} receiver(s)",
            created.kind,
            created.receivers.len()
        ));
        return Ok(());
    }

    let ledger = Arc::new(NotificationLedger::new(
        console.api.clone(),
        console.session.clone(),
    ));
    load(&ledger).await?;

    match &args.command {
        NotificationCommand::List { unseen } => {
            let rows: Vec<NotificationRow> = ledger
                .notifications()
                .iter()
                .filter(|n| !*unseen || n.is_unseen_by(&identity.email))
                .map(|n| NotificationRow::new(n, &identity.email))
                .collect();
            output::print_list(&rows, format);
            if matches!(format, OutputFormat::Table) {
                println!("{} unseen", ledger.unseen_count());
            }
        }
        NotificationCommand::Show { id, no_ack } => {
            let notification = ledger
                .get(id)
                .ok_or_else(|| AppError::not_found(format!("Notification '{id}' not found")))?;
            output::print_item(&notification, format, || {
                output::print_kv("Type", notification.kind.as_str());
                output::print_kv(
                    "From",
                    &format!("{} <{}>", notification.sender.name, notification.sender.email),
                );
                output::print_kv(
                    "Sent",
                    &notification.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                );
                output::print_kv("Receivers", &notification.receivers.len().to_string());
                println!();
                println!("{}", notification.content);
            });
            if !*no_ack {
                acknowledge(&ledger, id).await?;
            }
        }
        NotificationCommand::Seen { id } => {
            if ledger.get(id).is_none() {
                return Err(AppError::not_found(format!("Notification '{id}' not found")));
            }
            if acknowledge(&ledger, id).await? {
                output::print_success(&format!("Marked '{id}' as seen"));
            } else {
                output::print_warning(&format!("'{id}' was already seen or is not addressed to you"));
            }
        }
        NotificationCommand::Send { .. } | NotificationCommand::Templates => {}
    }

    Ok(())
}

/// Fetches the notification set, retrying once after a transient failure.
async fn load(ledger: &NotificationLedger) -> Result<(), AppError> {
    match ledger.refresh().await {
        Err(e) if e.is_retryable() => {
            output::print_warning(&format!("{}; retrying", e.message));
            ledger.refresh().await
        }
        other => other,
    }
}

/// Marks `id` seen and waits for the acknowledgement. `false` when nothing
/// needed acknowledging.
async fn acknowledge(ledger: &Arc<NotificationLedger>, id: &str) -> Result<bool, AppError> {
    let Some(task) = ledger.mark_seen(id) else {
        return Ok(false);
    };
    task.await
        .map_err(|e| AppError::internal(format!("Acknowledgement task failed: {e}")))?;
    if ledger.pending_acks().get(id) == Some(&AckState::Failed) {
        return Err(AppError::ack(format!(
            "The backend rejected the read acknowledgement for '{id}'"
        )));
    }
    Ok(true)
}
