//! Per-user notification cache with optimistic read-state.
//!
//! The ledger never merges push events incrementally. Every change
//! signal (session start, reconnect, notification event) triggers a full
//! [`refresh`](NotificationLedger::refresh) whose result replaces the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fmiis_api::StaffApi;
use fmiis_auth::{SessionState, SessionStore};
use fmiis_core::error::ErrorKind;
use fmiis_core::events::push::{ChannelEvent, PushEvent};
use fmiis_core::result::AppResult;
use fmiis_entity::Notification;

/// Error flag shown when a refresh fails.
pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch notifications";

/// State of an optimistic read acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckState {
    /// Sent, no answer yet. The optimistic value survives refreshes.
    InFlight,
    /// Accepted once refresh number `from` had been issued. Refreshes
    /// issued before that may predate the write and keep the local value.
    Acked {
        /// First refresh sequence number that reflects the write.
        from: u64,
    },
    /// Rejected. The next successful refresh takes the server's value.
    Failed,
}

impl AckState {
    /// Whether a refresh issued as number `seq` must keep the local read.
    fn holds_against(self, seq: u64) -> bool {
        match self {
            Self::InFlight => true,
            Self::Acked { from } => seq < from,
            Self::Failed => false,
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    /// Lowercased email the cache was fetched for.
    owner: Option<String>,
    notifications: Vec<Notification>,
    error: Option<String>,
    /// Refreshes in flight.
    loading: usize,
    /// Refreshes issued so far.
    issued: u64,
    pending: HashMap<String, AckState>,
}

impl LedgerState {
    fn owned_by(&self, email: &str) -> bool {
        self.owner
            .as_deref()
            .is_some_and(|owner| owner.eq_ignore_ascii_case(email))
    }
}

/// Notification set of the signed-in identity.
#[derive(Debug)]
pub struct NotificationLedger {
    /// Backend transport.
    api: Arc<dyn StaffApi>,
    /// Canonical session.
    session: Arc<SessionStore>,
    /// Cache and flags, mutated under a short lock.
    state: Mutex<LedgerState>,
    /// Bumped on every observable change.
    revision: watch::Sender<u64>,
}

impl NotificationLedger {
    /// Creates an empty ledger.
    pub fn new(api: Arc<dyn StaffApi>, session: Arc<SessionStore>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            api,
            session,
            state: Mutex::new(LedgerState::default()),
            revision,
        }
    }

    /// Fetches the full notification set for the current identity and
    /// replaces the cache.
    ///
    /// No-op without an identity. On failure the previous cache is kept and
    /// the error flag is set. A response that arrives after the session
    /// moved to another epoch is dropped.
    pub async fn refresh(&self) -> AppResult<()> {
        let session = self.session.snapshot();
        let Some(identity) = session.identity else {
            return Ok(());
        };

        let (seq, loading) = {
            let mut state = self.lock();
            let seq = state.issued;
            state.issued += 1;
            state.loading += 1;
            (seq, Loading(self))
        };
        self.bump();
        let result = self.api.notifications(&identity.email).await;
        drop(loading);

        let current_epoch = self.session.snapshot().epoch;
        let mut state = self.lock();

        if current_epoch != session.epoch {
            drop(state);
            self.bump();
            debug!(email = %identity.email, epoch = session.epoch, "Discarding stale notification fetch");
            return Ok(());
        }

        let outcome = match result {
            Ok(mut notifications) => {
                for notification in &mut notifications {
                    let holds = state
                        .pending
                        .get(&notification.id)
                        .is_some_and(|ack| ack.holds_against(seq));
                    if holds {
                        if let Some(receiver) = notification.receiver_for_mut(&identity.email) {
                            receiver.is_seen = true;
                        }
                    }
                }
                state.pending.retain(|_, ack| ack.holds_against(seq));
                debug!(email = %identity.email, count = notifications.len(), "Notifications refreshed");
                state.notifications = notifications;
                state.owner = Some(identity.email.to_lowercase());
                state.error = None;
                Ok(())
            }
            Err(e) => {
                let err = if e.is_retryable() {
                    e.into_kind(ErrorKind::Fetch)
                } else {
                    e
                };
                warn!(email = %identity.email, error = %err, "Notification fetch failed; keeping cached set");
                state.error = Some(FETCH_ERROR_MESSAGE.to_string());
                Err(err)
            }
        };
        drop(state);
        self.bump();
        outcome
    }

    /// Marks a notification as seen by the current identity.
    ///
    /// The local flag flips immediately; the acknowledgement is sent in a
    /// detached task whose handle is returned. Returns `None` (and does
    /// nothing) when there is no identity, the notification is not cached,
    /// the identity is not a receiver, or it has already seen it.
    pub fn mark_seen(self: &Arc<Self>, notification_id: &str) -> Option<JoinHandle<()>> {
        let session = self.session.snapshot();
        let email = session.identity.as_ref()?.email.clone();

        let applied = {
            let mut state = self.lock();
            if !state.owned_by(&email) {
                return None;
            }
            let receiver = state
                .notifications
                .iter_mut()
                .find(|n| n.id == notification_id)
                .and_then(|n| n.receiver_for_mut(&email))?;
            if receiver.is_seen {
                false
            } else {
                receiver.is_seen = true;
                state
                    .pending
                    .insert(notification_id.to_string(), AckState::InFlight);
                true
            }
        };
        if !applied {
            return None;
        }
        self.bump();

        let ledger = Arc::clone(self);
        let id = notification_id.to_string();
        Some(tokio::spawn(async move {
            let result = ledger.api.mark_notification_seen(&id, &email).await;
            if ledger.session.snapshot().epoch != session.epoch {
                debug!(notification = %id, "Discarding acknowledgement from a previous session");
                return;
            }
            {
                let mut state = ledger.lock();
                match result {
                    Ok(()) => {
                        let from = state.issued;
                        state.pending.insert(id.clone(), AckState::Acked { from });
                    }
                    Err(e) => {
                        let err = e.into_kind(ErrorKind::Ack);
                        warn!(notification = %id, email = %email, error = %err, "Seen acknowledgement failed");
                        state.pending.insert(id.clone(), AckState::Failed);
                    }
                }
            }
            ledger.bump();
        }))
    }

    /// Number of cached notifications the current identity has not seen.
    pub fn unseen_count(&self) -> usize {
        let Some(email) = self.current_email() else {
            return 0;
        };
        let state = self.lock();
        if !state.owned_by(&email) {
            return 0;
        }
        state
            .notifications
            .iter()
            .filter(|n| n.is_unseen_by(&email))
            .count()
    }

    /// Cached notifications in server order.
    pub fn notifications(&self) -> Vec<Notification> {
        let Some(email) = self.current_email() else {
            return Vec::new();
        };
        let state = self.lock();
        if state.owned_by(&email) {
            state.notifications.clone()
        } else {
            Vec::new()
        }
    }

    /// One cached notification.
    pub fn get(&self, notification_id: &str) -> Option<Notification> {
        let email = self.current_email()?;
        let state = self.lock();
        if !state.owned_by(&email) {
            return None;
        }
        state
            .notifications
            .iter()
            .find(|n| n.id == notification_id)
            .cloned()
    }

    /// Error flag of the last refresh.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Whether a refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().loading > 0
    }

    /// Acknowledgements not yet reconciled.
    pub fn pending_acks(&self) -> HashMap<String, AckState> {
        self.lock().pending.clone()
    }

    /// Drops the cache, the error flag, and pending acknowledgements.
    pub fn clear(&self) {
        self.update(|s| {
            s.owner = None;
            s.notifications.clear();
            s.error = None;
            s.pending.clear();
        });
    }

    /// Subscribe to a counter bumped on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Keeps the ledger in step with the session and the push channel until
    /// cancelled.
    ///
    /// Refreshes on every new session epoch with an identity, on every
    /// `Connected`, and on every notification-changed event; clears on
    /// logout.
    pub async fn run(
        self: Arc<Self>,
        mut session: watch::Receiver<SessionState>,
        mut events: broadcast::Receiver<ChannelEvent>,
        cancel: CancellationToken,
    ) {
        let mut refreshes = JoinSet::new();
        let mut seen_epoch: Option<u64> = None;
        let mut events_open = true;

        loop {
            let (epoch, email) = {
                let state = session.borrow_and_update();
                (state.epoch, state.email().map(String::from))
            };
            if seen_epoch != Some(epoch) {
                seen_epoch = Some(epoch);
                match email {
                    Some(email) => {
                        let foreign = {
                            let state = self.lock();
                            state.owner.is_some() && !state.owned_by(&email)
                        };
                        if foreign {
                            self.clear();
                        }
                        self.spawn_refresh(&mut refreshes);
                    }
                    None => {
                        // In-flight fetches finish and are dropped as stale.
                        self.clear();
                        info!("Notification cache cleared");
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                event = events.recv(), if events_open => match event {
                    Ok(ChannelEvent::Connected)
                    | Ok(ChannelEvent::Event(PushEvent::NotificationChanged { .. })) => {
                        self.spawn_refresh(&mut refreshes);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Push events lagged; refreshing");
                        self.spawn_refresh(&mut refreshes);
                    }
                    Err(broadcast::error::RecvError::Closed) => events_open = false,
                },
                Some(_) = refreshes.join_next(), if !refreshes.is_empty() => {}
            }
        }

        refreshes.shutdown().await;
        debug!("Notification follower stopped");
    }

    fn spawn_refresh(self: &Arc<Self>, refreshes: &mut JoinSet<()>) {
        let ledger = Arc::clone(self);
        refreshes.spawn(async move {
            // Failures are logged and flagged inside refresh.
            let _ = ledger.refresh().await;
        });
    }

    fn current_email(&self) -> Option<String> {
        self.session.current().map(|i| i.email)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut LedgerState)) {
        f(&mut self.lock());
        self.bump();
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

/// Counts one refresh as in flight until dropped, including on abort.
struct Loading<'a>(&'a NotificationLedger);

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.0.lock();
            state.loading = state.loading.saturating_sub(1);
        }
        self.0.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use fmiis_api::mock::MockStaffApi;
    use fmiis_core::config::SessionConfig;
    use fmiis_entity::{Identity, NotificationType, Receiver, Role, Sender};
    use fmiis_storage::memory::MemoryStore;
    use tokio::time;

    fn identity(email: &str, role: Role) -> Identity {
        Identity {
            id: format!("id-{email}"),
            display_name: "Moe".to_string(),
            email: email.to_string(),
            role,
            avatar_ref: None,
        }
    }

    fn notification(id: &str, receivers: &[(&str, bool)]) -> Notification {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 1, 30, 0).unwrap();
        Notification {
            id: id.to_string(),
            kind: NotificationType::General,
            sender: Sender {
                id: "s1".to_string(),
                name: "Gm".to_string(),
                email: "gm@x.com".to_string(),
                role: Role::Gm,
                avatar_ref: None,
            },
            receivers: receivers
                .iter()
                .map(|(email, seen)| Receiver {
                    email: email.to_string(),
                    name: "R".to_string(),
                    is_seen: *seen,
                })
                .collect(),
            content: "General notification for all team members.".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    fn setup() -> (Arc<MockStaffApi>, Arc<SessionStore>, Arc<NotificationLedger>) {
        let api = Arc::new(MockStaffApi::new());
        let session = Arc::new(SessionStore::new(
            Arc::new(MemoryStore::new()),
            &SessionConfig::default(),
        ));
        let ledger = Arc::new(NotificationLedger::new(api.clone(), session.clone()));
        (api, session, ledger)
    }

    fn expected_unseen(ledger: &NotificationLedger, email: &str) -> usize {
        ledger
            .notifications()
            .iter()
            .filter(|n| n.receiver_for(email).is_some_and(|r| !r.is_seen))
            .count()
    }

    #[tokio::test]
    async fn test_refresh_without_identity_is_noop() {
        let (api, _session, ledger) = setup();
        ledger.refresh().await.unwrap();
        assert!(api.fetches().is_empty());
        assert!(ledger.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_mark_seen_scenario() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
        ledger.refresh().await.unwrap();
        assert_eq!(ledger.unseen_count(), 1);

        ledger.mark_seen("n1").unwrap().await.unwrap();
        assert_eq!(ledger.unseen_count(), 0);
        assert!(ledger.get("n1").unwrap().receivers[0].is_seen);
        assert_eq!(api.acks(), vec![("n1".to_string(), "hr@x.com".to_string())]);
        assert!(matches!(ledger.pending_acks().get("n1"), Some(AckState::Acked { .. })));

        assert!(ledger.mark_seen("n1").is_none());
        assert_eq!(api.acks().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_seen_ignores_unknown_and_foreign() {
        let (api, session, ledger) = setup();
        session.login(identity("dev@x.com", Role::Dev));
        api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
        ledger.refresh().await.unwrap();

        assert!(ledger.mark_seen("missing").is_none());
        assert!(ledger.mark_seen("n1").is_none());
        assert!(api.acks().is_empty());
        assert!(!ledger.get("n1").unwrap().receivers[0].is_seen);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cache() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_notifications(vec![
            notification("n1", &[("hr@x.com", false)]),
            notification("n2", &[("hr@x.com", true)]),
        ]);
        ledger.refresh().await.unwrap();
        let before = ledger.notifications();

        api.fail_fetch(true);
        let err = ledger.refresh().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Fetch);
        assert_eq!(ledger.error().as_deref(), Some(FETCH_ERROR_MESSAGE));
        assert_eq!(ledger.notifications(), before);
        assert_eq!(ledger.unseen_count(), 1);

        api.fail_fetch(false);
        ledger.refresh().await.unwrap();
        assert!(ledger.error().is_none());
    }

    #[tokio::test]
    async fn test_server_order_is_kept() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_notifications(vec![
            notification("b", &[("hr@x.com", false)]),
            notification("a", &[("hr@x.com", false)]),
            notification("c", &[]),
        ]);
        ledger.refresh().await.unwrap();
        let ids: Vec<String> = ledger.notifications().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_refresh_is_discarded() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
        api.set_fetch_delay(Some(Duration::from_millis(50)));

        let pending = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.refresh().await }
        });
        time::sleep(Duration::from_millis(10)).await;
        assert!(ledger.is_loading());
        session.logout();
        session.login(identity("glob@x.com", Role::Glob));

        pending.await.unwrap().unwrap();
        assert!(!ledger.is_loading());
        assert!(ledger.notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_ack_survives_refresh() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
        ledger.refresh().await.unwrap();

        api.set_ack_delay(Some(Duration::from_millis(100)));
        let ack = ledger.mark_seen("n1").unwrap();
        assert_eq!(ledger.pending_acks().get("n1"), Some(&AckState::InFlight));

        // The server has not recorded the read yet.
        ledger.refresh().await.unwrap();
        assert_eq!(ledger.unseen_count(), 0);

        ack.await.unwrap();
        api.set_notifications(vec![notification("n1", &[("hr@x.com", true)])]);
        ledger.refresh().await.unwrap();
        assert!(ledger.pending_acks().is_empty());
        assert_eq!(ledger.unseen_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acked_read_survives_refresh_issued_before_ack() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
        ledger.refresh().await.unwrap();

        // Issued before the read; carries the old server state.
        api.set_fetch_delay(Some(Duration::from_millis(50)));
        let older = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.refresh().await }
        });
        time::sleep(Duration::from_millis(10)).await;

        ledger.mark_seen("n1").unwrap().await.unwrap();
        assert_eq!(ledger.unseen_count(), 0);

        older.await.unwrap().unwrap();
        assert_eq!(ledger.unseen_count(), 0);
        assert!(ledger.get("n1").unwrap().receivers[0].is_seen);
        assert!(matches!(ledger.pending_acks().get("n1"), Some(AckState::Acked { .. })));

        // Issued after the ack; the server has recorded the read.
        api.set_fetch_delay(None);
        api.set_notifications(vec![notification("n1", &[("hr@x.com", true)])]);
        ledger.refresh().await.unwrap();
        assert!(ledger.pending_acks().is_empty());
        assert_eq!(ledger.unseen_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_refresh_clears_loading() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_fetch_delay(Some(Duration::from_millis(50)));

        let task = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.refresh().await }
        });
        time::sleep(Duration::from_millis(10)).await;
        assert!(ledger.is_loading());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!ledger.is_loading());
    }

    #[tokio::test]
    async fn test_failed_ack_reconciles_on_next_refresh() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
        ledger.refresh().await.unwrap();

        api.fail_acks(true);
        ledger.mark_seen("n1").unwrap().await.unwrap();
        // Not reverted locally.
        assert_eq!(ledger.unseen_count(), 0);
        assert_eq!(ledger.pending_acks().get("n1"), Some(&AckState::Failed));

        ledger.refresh().await.unwrap();
        assert_eq!(ledger.unseen_count(), 1);
        assert!(ledger.pending_acks().is_empty());
    }

    #[tokio::test]
    async fn test_unseen_count_tracks_cache() {
        let (api, session, ledger) = setup();
        session.login(identity("Md@X.com", Role::Md));
        api.set_notifications(vec![
            notification("n1", &[("md@x.com", false), ("gm@x.com", false)]),
            notification("n2", &[("md@x.com", true)]),
            notification("n3", &[("gm@x.com", false)]),
            notification("n4", &[("MD@x.com", false)]),
        ]);
        ledger.refresh().await.unwrap();
        assert_eq!(ledger.unseen_count(), expected_unseen(&ledger, "md@x.com"));
        assert_eq!(ledger.unseen_count(), 2);

        ledger.mark_seen("n4").unwrap().await.unwrap();
        ledger.mark_seen("n3");
        assert_eq!(ledger.unseen_count(), expected_unseen(&ledger, "md@x.com"));
        assert_eq!(ledger.unseen_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_hidden_from_other_identity() {
        let (api, session, ledger) = setup();
        session.login(identity("hr@x.com", Role::Hr));
        api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
        ledger.refresh().await.unwrap();

        session.login(identity("dev@x.com", Role::Dev));
        assert!(ledger.notifications().is_empty());
        assert!(ledger.get("n1").is_none());
        assert_eq!(ledger.unseen_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follower_refreshes_and_clears() {
        let (api, session, ledger) = setup();
        api.set_notifications(vec![notification("n1", &[("hr@x.com", false)])]);
        let (events, _) = broadcast::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(ledger.clone().run(
            session.subscribe(),
            events.subscribe(),
            cancel.clone(),
        ));

        session.login(identity("hr@x.com", Role::Hr));
        time::sleep(Duration::from_millis(5)).await;
        assert_eq!(api.fetches().len(), 1);
        assert_eq!(ledger.unseen_count(), 1);

        events
            .send(ChannelEvent::Event(PushEvent::NotificationChanged {
                name: "new_notification".to_string(),
                payload: None,
            }))
            .unwrap();
        time::sleep(Duration::from_millis(5)).await;
        assert_eq!(api.fetches().len(), 2);

        events
            .send(ChannelEvent::Event(PushEvent::EmployeeCreated { payload: None }))
            .unwrap();
        time::sleep(Duration::from_millis(5)).await;
        assert_eq!(api.fetches().len(), 2);

        events.send(ChannelEvent::Connected).unwrap();
        time::sleep(Duration::from_millis(5)).await;
        assert_eq!(api.fetches().len(), 3);

        session.logout();
        time::sleep(Duration::from_millis(5)).await;
        assert!(ledger.notifications().is_empty());
        assert!(ledger.pending_acks().is_empty());

        cancel.cancel();
        task.await.unwrap();
    }
}
