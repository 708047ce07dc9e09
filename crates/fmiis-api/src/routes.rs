//! Endpoint path segments for every backend route the core uses.
//!
//! Segments are joined onto the configured base URL and prefix by the
//! HTTP client, which percent-encodes each one.

/// `POST /login`
pub const LOGIN: &[&str] = &["login"];

/// `POST /logout`
pub const LOGOUT: &[&str] = &["logout"];

/// `GET /auth/me`
pub const WHOAMI: &[&str] = &["auth", "me"];

/// `POST /send-notification`
pub const SEND_NOTIFICATION: &[&str] = &["send-notification"];

/// `GET /get-all-employees`
pub const EMPLOYEES: &[&str] = &["get-all-employees"];

/// `GET /get-all-notifications/{email}`
pub fn notifications(email: &str) -> [&str; 2] {
    ["get-all-notifications", email]
}

/// `POST /mark-notification-as-seen/{id}`
pub fn mark_seen(notification_id: &str) -> [&str; 2] {
    ["mark-notification-as-seen", notification_id]
}
