//! Backend REST API configuration.

use serde::{Deserialize, Serialize};

/// Request/response client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scheme, host and port of the backend, e.g. `http://localhost:5000`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix shared by every endpoint.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            prefix: default_prefix(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_prefix() -> String {
    "/api/fmiis-backend/v001".to_string()
}

fn default_request_timeout() -> u64 {
    15
}
