//! Push transport seam.

use async_trait::async_trait;

use fmiis_core::result::AppResult;
use fmiis_entity::Identity;

/// A named server event as received off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Event name.
    pub name: String,
    /// Event payload.
    pub payload: Option<serde_json::Value>,
}

impl RawEvent {
    /// Creates an event.
    pub fn new(name: impl Into<String>, payload: Option<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Opens push connections.
#[async_trait]
pub trait PushConnector: Send + Sync + std::fmt::Debug + 'static {
    /// Connects to `endpoint` on behalf of `identity`, completing the
    /// handshake before returning.
    async fn connect(&self, endpoint: &str, identity: &Identity)
    -> AppResult<Box<dyn PushConnection>>;
}

/// One live push connection, exclusively owned by its connection task.
#[async_trait]
pub trait PushConnection: Send + std::fmt::Debug {
    /// Waits for the next server event.
    ///
    /// `Ok(None)` means the server closed the connection cleanly. Keepalive
    /// traffic is handled internally and never surfaces here.
    async fn next_event(&mut self) -> AppResult<Option<RawEvent>>;

    /// Closes the connection. Errors are ignored.
    async fn close(&mut self);
}
