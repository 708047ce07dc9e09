//! Push channel configuration.

use serde::{Deserialize, Serialize};

/// Live push channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Server endpoint for the event stream. The channel stays idle when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// First reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,
    /// Upper bound for the reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,
    /// Buffer size of the broadcast stream handed to consumers.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Event names that mean "the notification set changed".
    #[serde(default = "default_notification_events")]
    pub notification_events: Vec<String>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_ms: default_reconnect_max(),
            channel_buffer_size: default_channel_buffer(),
            notification_events: default_notification_events(),
        }
    }
}

impl PushConfig {
    /// Whether an event name is one of the notification-changed triggers.
    pub fn is_notification_event(&self, name: &str) -> bool {
        self.notification_events.iter().any(|e| e == name)
    }
}

fn default_reconnect_initial() -> u64 {
    500
}

fn default_reconnect_max() -> u64 {
    30_000
}

fn default_channel_buffer() -> usize {
    256
}

fn default_notification_events() -> Vec<String> {
    vec![
        "notification_created".to_string(),
        "notification_updated".to_string(),
        "new_notification".to_string(),
    ]
}
