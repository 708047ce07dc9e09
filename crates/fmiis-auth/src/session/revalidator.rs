//! Server-side revalidation of the persisted identity.
//!
//! A restored session is only as good as the cookie behind it. The
//! revalidator asks the backend who we are whenever a new session epoch
//! starts (and periodically after that), reconciles the local profile with
//! the server's answer, and publishes the outcome.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fmiis_api::StaffApi;
use fmiis_core::config::SessionConfig;
use fmiis_core::error::{AppError, ErrorKind};

use super::store::SessionStore;

/// Published revalidation status.
///
/// Only the first probe of a session epoch publishes `Checking`; later
/// periodic probes keep the previous status until they resolve.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RevalidationStatus {
    /// No session to check, or no probe issued yet.
    #[default]
    Idle,
    /// A probe is in flight.
    Checking,
    /// The server confirmed the session.
    Confirmed,
    /// The last probe failed; the identity is retained unless configured otherwise.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
}

/// Result of one probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// No identity; nothing to check.
    Skipped,
    /// The server agrees with the local identity.
    Confirmed,
    /// The server's profile differed and the local one was updated.
    Reconciled,
    /// The session changed while the probe was in flight; result dropped.
    Stale,
    /// The probe failed.
    Failed(AppError),
}

/// Confirms the persisted identity against `GET /auth/me`.
#[derive(Debug)]
pub struct SessionRevalidator {
    /// Backend transport.
    api: Arc<dyn StaffApi>,
    /// Canonical session.
    session: Arc<SessionStore>,
    /// Session configuration.
    config: SessionConfig,
    /// Published status.
    status: watch::Sender<RevalidationStatus>,
    /// Epoch whose first probe has resolved.
    settled_epoch: Mutex<Option<u64>>,
}

impl SessionRevalidator {
    /// Creates a new revalidator.
    pub fn new(api: Arc<dyn StaffApi>, session: Arc<SessionStore>, config: SessionConfig) -> Self {
        let (status, _) = watch::channel(RevalidationStatus::Idle);
        Self {
            api,
            session,
            config,
            status,
            settled_epoch: Mutex::new(None),
        }
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<RevalidationStatus> {
        self.status.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> RevalidationStatus {
        self.status.borrow().clone()
    }

    /// Issues one probe for the current session.
    pub async fn revalidate(&self) -> ProbeOutcome {
        let snapshot = self.session.snapshot();
        let Some(local) = snapshot.identity else {
            self.status.send_replace(RevalidationStatus::Idle);
            return ProbeOutcome::Skipped;
        };

        if !self.is_settled(snapshot.epoch) {
            self.status.send_replace(RevalidationStatus::Checking);
        }
        let result = self.api.whoami().await;

        if self.session.snapshot().epoch != snapshot.epoch {
            debug!(epoch = snapshot.epoch, "Discarding stale revalidation result");
            return ProbeOutcome::Stale;
        }
        *self.settled_epoch.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.epoch);

        let result = result.and_then(|remote| {
            if remote.email_matches(&local.email) {
                Ok(remote)
            } else {
                Err(AppError::auth_probe(format!(
                    "Server session belongs to '{}', not '{}'",
                    remote.email, local.email
                )))
            }
        });

        match result {
            Ok(remote) => {
                self.status.send_replace(RevalidationStatus::Confirmed);
                if self.session.update_profile(remote) {
                    info!(email = %local.email, "Session profile reconciled with server");
                    ProbeOutcome::Reconciled
                } else {
                    debug!(email = %local.email, "Session confirmed");
                    ProbeOutcome::Confirmed
                }
            }
            Err(e) => {
                let err = e.into_kind(ErrorKind::AuthProbe);
                warn!(email = %local.email, error = %err, "Session revalidation failed");
                self.status.send_replace(RevalidationStatus::Failed {
                    reason: err.message.clone(),
                });
                if self.config.logout_on_probe_failure {
                    info!(email = %local.email, "Clearing session after failed revalidation");
                    self.session.logout();
                }
                ProbeOutcome::Failed(err)
            }
        }
    }

    /// Runs until cancelled: probes on every new session epoch that has an
    /// identity, and on every tick of the configured interval.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut session_rx = self.session.subscribe();
        let mut ticker = self.ticker();
        let mut probed_epoch: Option<u64> = None;

        loop {
            let (epoch, signed_in) = {
                let state = session_rx.borrow_and_update();
                (state.epoch, state.identity.is_some())
            };

            if probed_epoch != Some(epoch) {
                probed_epoch = Some(epoch);
                if signed_in {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.revalidate() => {}
                    }
                    continue;
                }
                self.status.send_replace(RevalidationStatus::Idle);
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = next_tick(&mut ticker) => {
                    if signed_in {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = self.revalidate() => {}
                        }
                    }
                }
            }
        }

        debug!("Revalidator stopped");
    }

    fn is_settled(&self, epoch: u64) -> bool {
        *self.settled_epoch.lock().unwrap_or_else(|e| e.into_inner()) == Some(epoch)
    }

    fn ticker(&self) -> Option<Interval> {
        let seconds = self.config.revalidate_interval_seconds;
        (seconds > 0).then(|| {
            let period = Duration::from_secs(seconds);
            time::interval_at(Instant::now() + period, period)
        })
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmiis_api::mock::MockStaffApi;
    use fmiis_entity::{Identity, Role};
    use fmiis_storage::memory::MemoryStore;

    fn identity(role: Role) -> Identity {
        Identity {
            id: "u1".to_string(),
            display_name: "Kyaw".to_string(),
            email: "kyaw@x.com".to_string(),
            role,
            avatar_ref: None,
        }
    }

    fn setup(config: SessionConfig) -> (Arc<MockStaffApi>, Arc<SessionStore>, SessionRevalidator) {
        let api = Arc::new(MockStaffApi::new());
        let session = Arc::new(SessionStore::new(Arc::new(MemoryStore::new()), &config));
        let revalidator = SessionRevalidator::new(api.clone(), session.clone(), config);
        (api, session, revalidator)
    }

    #[tokio::test]
    async fn test_skipped_without_identity() {
        let (api, _session, revalidator) = setup(SessionConfig::default());
        assert!(matches!(revalidator.revalidate().await, ProbeOutcome::Skipped));
        assert_eq!(api.whoami_calls(), 0);
    }

    #[tokio::test]
    async fn test_confirmed() {
        let (api, session, revalidator) = setup(SessionConfig::default());
        session.login(identity(Role::Dev));
        api.set_whoami(Some(identity(Role::Dev)));

        assert!(matches!(revalidator.revalidate().await, ProbeOutcome::Confirmed));
        assert_eq!(revalidator.status(), RevalidationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_role_change_is_reconciled() {
        let (api, session, revalidator) = setup(SessionConfig::default());
        session.login(identity(Role::Dev));
        api.set_whoami(Some(identity(Role::Hr)));

        assert!(matches!(revalidator.revalidate().await, ProbeOutcome::Reconciled));
        assert_eq!(session.current().map(|i| i.role), Some(Role::Hr));
    }

    #[tokio::test]
    async fn test_failure_retains_identity_by_default() {
        let (_api, session, revalidator) = setup(SessionConfig::default());
        session.login(identity(Role::Gm));

        match revalidator.revalidate().await {
            ProbeOutcome::Failed(err) => assert_eq!(err.kind, ErrorKind::AuthProbe),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(session.current().is_some());
        assert!(matches!(revalidator.status(), RevalidationStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_failure_can_clear_session() {
        let config = SessionConfig {
            logout_on_probe_failure: true,
            ..SessionConfig::default()
        };
        let (_api, session, revalidator) = setup(config);
        session.login(identity(Role::Gm));

        assert!(matches!(revalidator.revalidate().await, ProbeOutcome::Failed(_)));
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_foreign_identity_is_a_failure() {
        let (api, session, revalidator) = setup(SessionConfig::default());
        session.login(identity(Role::Md));
        let mut other = identity(Role::Md);
        other.email = "someone@x.com".to_string();
        api.set_whoami(Some(other));

        assert!(matches!(revalidator.revalidate().await, ProbeOutcome::Failed(_)));
        assert_eq!(session.current().map(|i| i.email), Some("kyaw@x.com".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_probes_once_per_login() {
        let config = SessionConfig {
            revalidate_interval_seconds: 0,
            ..SessionConfig::default()
        };
        let (api, session, revalidator) = setup(config);
        api.set_whoami(Some(identity(Role::Hr)));
        let revalidator = Arc::new(revalidator);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(revalidator.clone().run(cancel.clone()));

        session.login(identity(Role::Hr));
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.whoami_calls(), 1);
        assert_eq!(revalidator.status(), RevalidationStatus::Confirmed);

        session.logout();
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(revalidator.status(), RevalidationStatus::Idle);
        assert_eq!(api.whoami_calls(), 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_probes_periodically() {
        let config = SessionConfig {
            revalidate_interval_seconds: 60,
            ..SessionConfig::default()
        };
        let (api, session, revalidator) = setup(config);
        api.set_whoami(Some(identity(Role::Glob)));
        session.login(identity(Role::Glob));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::new(revalidator).run(cancel.clone()));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.whoami_calls(), 1);
        time::sleep(Duration::from_secs(121)).await;
        assert_eq!(api.whoami_calls(), 3);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_probe_keeps_confirmed_status() {
        let (api, session, revalidator) = setup(SessionConfig::default());
        api.set_whoami(Some(identity(Role::Dev)));
        api.set_whoami_delay(Some(Duration::from_millis(50)));
        session.login(identity(Role::Dev));
        let revalidator = Arc::new(revalidator);

        let first = tokio::spawn({
            let revalidator = revalidator.clone();
            async move { revalidator.revalidate().await }
        });
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(revalidator.status(), RevalidationStatus::Checking);
        assert!(matches!(first.await.unwrap(), ProbeOutcome::Confirmed));

        let again = tokio::spawn({
            let revalidator = revalidator.clone();
            async move { revalidator.revalidate().await }
        });
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(revalidator.status(), RevalidationStatus::Confirmed);
        assert!(matches!(again.await.unwrap(), ProbeOutcome::Confirmed));

        // A new login starts a new epoch and checks again.
        session.login(identity(Role::Dev));
        let fresh = tokio::spawn({
            let revalidator = revalidator.clone();
            async move { revalidator.revalidate().await }
        });
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(revalidator.status(), RevalidationStatus::Checking);
        fresh.await.unwrap();
    }
}
