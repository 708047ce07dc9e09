//! Canonical session identity with durable mirroring.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use fmiis_core::config::SessionConfig;
use fmiis_core::traits::store::DurableStore;
use fmiis_entity::Identity;

/// Snapshot of the session published to dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// The signed-in identity, if any.
    pub identity: Option<Identity>,
    /// Incremented on every login, logout and rehydrate. Asynchronous work
    /// records the epoch it started under and drops its result if the
    /// epoch has moved on.
    pub epoch: u64,
    /// Whether the persisted record has been read (or a transition has
    /// otherwise decided the session).
    pub rehydrated: bool,
}

impl SessionState {
    /// Email of the signed-in identity.
    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.email.as_str())
    }
}

/// Owns the one canonical identity and mirrors it to durable storage.
///
/// All transitions are synchronous. Dependents observe changes through
/// [`SessionStore::subscribe`].
#[derive(Debug)]
pub struct SessionStore {
    /// Durable mirror of the identity.
    store: Arc<dyn DurableStore>,
    /// Singleton key of the persisted record.
    key: String,
    /// Current state and change notification.
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Creates a session store with no identity; call [`rehydrate`](Self::rehydrate) next.
    pub fn new(store: Arc<dyn DurableStore>, config: &SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            store,
            key: config.storage_key.clone(),
            state,
        }
    }

    /// Sets the canonical identity, persists it, and notifies dependents.
    ///
    /// A failed persistence write is logged; the identity stays in memory.
    pub fn login(&self, identity: Identity) {
        self.persist(&identity);
        info!(email = %identity.email, role = %identity.role, "Session started");
        self.state.send_modify(|s| {
            s.identity = Some(identity);
            s.epoch += 1;
            s.rehydrated = true;
        });
    }

    /// Clears the canonical identity and removes the persisted record.
    pub fn logout(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Failed to remove persisted session");
        }
        let previous = self.state.borrow().email().map(String::from);
        self.state.send_modify(|s| {
            s.identity = None;
            s.epoch += 1;
            s.rehydrated = true;
        });
        info!(email = ?previous, "Session ended");
    }

    /// Restores the identity from durable storage.
    ///
    /// Absence or a corrupted record both yield no identity; a corrupted
    /// record is also removed. Never fails.
    pub fn rehydrate(&self) {
        let identity = match self.store.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Discarding corrupted session record");
                    if let Err(e) = self.store.remove(&self.key) {
                        warn!(key = %self.key, error = %e, "Failed to remove corrupted session record");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read persisted session");
                None
            }
        };

        match &identity {
            Some(i) => info!(email = %i.email, provider = self.store.provider_type(), "Session restored"),
            None => debug!(provider = self.store.provider_type(), "No persisted session"),
        }

        self.state.send_modify(|s| {
            s.identity = identity;
            s.epoch += 1;
            s.rehydrated = true;
        });
    }

    /// Replaces the profile of the current identity without starting a new
    /// session epoch.
    ///
    /// Only applies when `identity` has the same email as the current one;
    /// returns whether anything changed.
    pub fn update_profile(&self, identity: Identity) -> bool {
        let applies = {
            let current = self.state.borrow();
            match &current.identity {
                Some(existing) => {
                    existing.email_matches(&identity.email) && *existing != identity
                }
                None => false,
            }
        };
        if !applies {
            return false;
        }

        self.persist(&identity);
        info!(email = %identity.email, role = %identity.role, "Session profile updated");
        self.state.send_modify(|s| s.identity = Some(identity));
        true
    }

    /// A snapshot of the current identity.
    pub fn current(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// A snapshot of the full session state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn persist(&self, identity: &Identity) {
        let result = serde_json::to_string(identity)
            .map_err(fmiis_core::AppError::from)
            .and_then(|json| self.store.set(&self.key, &json));
        if let Err(e) = result {
            warn!(key = %self.key, error = %e, "Failed to persist session; keeping it in memory only");
        }
    }
}
