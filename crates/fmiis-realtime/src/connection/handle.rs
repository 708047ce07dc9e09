//! Scoped ownership of a running connection task.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// Owns the task that drives one identity's push connection.
///
/// Dropping the handle cancels the task, so the connection can never
/// outlive the session that opened it. [`ConnectionHandle::shutdown`]
/// additionally waits for the task to finish.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Email of the identity the connection belongs to
    pub email: String,
    /// Cancels the connection task
    cancel: CancellationToken,
    /// The connection task
    task: Option<JoinHandle<()>>,
}

impl ConnectionHandle {
    /// Wraps a spawned connection task and its cancellation token.
    pub fn new(id: ConnectionId, email: String, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            id,
            email,
            cancel,
            task: Some(task),
        }
    }

    /// Whether this handle serves `email`.
    pub fn serves(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }

    /// Cancels the task and waits for it to release the connection.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!(connection = %self.id, "Push connection task panicked");
                }
            }
        }
        debug!(connection = %self.id, email = %self.email, "Push connection released");
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
