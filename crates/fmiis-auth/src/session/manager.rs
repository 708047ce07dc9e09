//! Session lifecycle manager: login and logout flows against the backend.

use std::sync::Arc;

use tracing::{info, warn};

use fmiis_api::StaffApi;
use fmiis_core::error::AppError;
use fmiis_entity::Identity;

use super::store::SessionStore;

/// Drives the login and logout flows.
///
/// The backend call happens first; the local transition on the
/// [`SessionStore`] happens after it, synchronously.
#[derive(Debug, Clone)]
pub struct SessionManager {
    /// Backend transport.
    api: Arc<dyn StaffApi>,
    /// Canonical session.
    session: Arc<SessionStore>,
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(api: Arc<dyn StaffApi>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    /// Authenticates with the backend and starts a session.
    ///
    /// On failure the current session is left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("Email and password are required"));
        }

        let identity = self.api.login(email, password).await.map_err(|e| {
            warn!(email, error = %e, "Login failed");
            e
        })?;

        info!(email = %identity.email, section = %identity.section(), "Login succeeded");
        self.session.login(identity.clone());
        Ok(identity)
    }

    /// Ends the server-side session and clears the local one.
    ///
    /// The local session is cleared even when the backend call fails, so
    /// the user is never left signed in locally after asking to leave.
    pub async fn logout(&self) {
        if self.session.current().is_none() {
            return;
        }
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Backend logout failed; clearing local session anyway");
        }
        self.session.logout();
    }

    /// The session this manager drives.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }
}
