//! Runs the console engine in the foreground and prints what it observes.

use std::sync::Arc;

use clap::Args;
use tokio::sync::broadcast::error::RecvError;

use crate::output;
use fmiis_core::config::AppConfig;
use fmiis_core::error::AppError;
use fmiis_core::events::{ChannelEvent, PushEvent};
use fmiis_realtime::{ConsoleEngine, SocketIoConnector};

use super::Console;

/// Arguments for the watch command
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Location to start at; defaults to the signed-in user's home
    #[arg(short, long)]
    pub path: Option<String>,
}

/// Execute the watch command
pub async fn execute(args: &WatchArgs, config: &AppConfig) -> Result<(), AppError> {
    let console = Console::open(config)?;
    let engine = ConsoleEngine::new(
        config,
        console.api.clone(),
        Arc::new(SocketIoConnector::new()),
        console.session.clone(),
    );
    engine.start();

    let start = args.path.clone().or_else(|| {
        console
            .session
            .current()
            .map(|identity| fmiis_auth::guard::policies::home_path(identity.role))
    });
    if let Some(path) = start {
        engine.navigate(path);
    }

    let mut events = engine.push().subscribe();
    let mut revisions = engine.ledger().subscribe();
    let mut location = engine.subscribe_location();
    let mut last_unseen = None;

    output::print_success("Watching; press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ChannelEvent::Connected) => output::print_success("Push channel connected"),
                Ok(ChannelEvent::Disconnected) => output::print_warning("Push channel disconnected"),
                Ok(ChannelEvent::Event(PushEvent::EmployeeCreated { .. })) => {
                    println!("· employee_created");
                }
                Ok(ChannelEvent::Event(event)) => println!("· {}", event.name()),
                Err(RecvError::Lagged(skipped)) => {
                    output::print_warning(&format!("Skipped {skipped} push events"));
                }
                Err(RecvError::Closed) => break,
            },
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(error) = engine.ledger().error() {
                    output::print_warning(&error);
                }
                let unseen = engine.ledger().unseen_count();
                if last_unseen != Some(unseen) {
                    println!("Unseen notifications: {unseen}");
                    last_unseen = Some(unseen);
                }
            }
            changed = location.changed() => {
                if changed.is_err() {
                    break;
                }
                let outcome = engine.guard();
                println!("Location: {} ({})", engine.location(), outcome.state);
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}
