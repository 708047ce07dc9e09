//! Session persistence and revalidation configuration.

use serde::{Deserialize, Serialize};

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Durable store key holding the serialized identity.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Interval between background revalidation probes in seconds (0 = only on login).
    #[serde(default = "default_revalidate_interval")]
    pub revalidate_interval_seconds: u64,
    /// Clear the session when the revalidation probe fails.
    #[serde(default)]
    pub logout_on_probe_failure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            revalidate_interval_seconds: default_revalidate_interval(),
            logout_on_probe_failure: false,
        }
    }
}

fn default_storage_key() -> String {
    "user".to_string()
}

fn default_revalidate_interval() -> u64 {
    300
}
