//! Durable store configuration.

use serde::{Deserialize, Serialize};

/// Durable key-value store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider type: `"file"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Directory used by the file provider.
    #[serde(default = "default_directory")]
    pub directory: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            directory: default_directory(),
        }
    }
}

fn default_provider() -> String {
    "file".to_string()
}

fn default_directory() -> String {
    "data/store".to_string()
}
