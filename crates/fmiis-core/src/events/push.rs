//! Push event types.

use serde::{Deserialize, Serialize};

use crate::config::PushConfig;

/// A server-initiated event received over the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// A new employee record was created (consumed by the employee list).
    EmployeeCreated {
        /// Raw event payload.
        payload: Option<serde_json::Value>,
    },
    /// The notification set of one or more users changed.
    NotificationChanged {
        /// Server-side event name that triggered this.
        name: String,
        /// Raw event payload.
        payload: Option<serde_json::Value>,
    },
    /// Any other named event, forwarded as-is.
    Other {
        /// Event name.
        name: String,
        /// Raw event payload.
        payload: Option<serde_json::Value>,
    },
}

impl PushEvent {
    /// Classify a named server event.
    pub fn classify(
        name: &str,
        payload: Option<serde_json::Value>,
        config: &PushConfig,
    ) -> Self {
        if name == "employee_created" {
            Self::EmployeeCreated { payload }
        } else if config.is_notification_event(name) {
            Self::NotificationChanged {
                name: name.to_string(),
                payload,
            }
        } else {
            Self::Other {
                name: name.to_string(),
                payload,
            }
        }
    }

    /// Event name as sent by the server.
    pub fn name(&self) -> &str {
        match self {
            Self::EmployeeCreated { .. } => "employee_created",
            Self::NotificationChanged { name, .. } | Self::Other { name, .. } => name,
        }
    }
}

/// What consumers of the push channel observe.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The channel completed its handshake.
    Connected,
    /// The channel lost or closed its connection.
    Disconnected,
    /// A server event arrived.
    Event(PushEvent),
}
