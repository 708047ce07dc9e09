//! Top-level console engine that ties the session, push channel, ledger,
//! revalidator, and route guard together.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fmiis_api::StaffApi;
use fmiis_auth::guard::machine::{GuardInput, GuardOutcome, GuardState, RouteDecision, RouteGuard};
use fmiis_auth::{RevalidationStatus, SessionManager, SessionRevalidator, SessionState, SessionStore};
use fmiis_core::config::AppConfig;

use crate::channel::PushChannel;
use crate::connection::PushConnector;
use crate::notification::{NotificationComposer, NotificationLedger};

/// Central engine owning one of each core component.
///
/// [`start`](ConsoleEngine::start) spawns the long-lived tasks;
/// [`shutdown`](ConsoleEngine::shutdown) cancels them and waits.
pub struct ConsoleEngine {
    /// Canonical session.
    session: Arc<SessionStore>,
    /// Login/logout flows.
    manager: SessionManager,
    /// Push channel.
    push: Arc<PushChannel>,
    /// Notification cache.
    ledger: Arc<NotificationLedger>,
    /// Session revalidation.
    revalidator: Arc<SessionRevalidator>,
    /// Outgoing notifications.
    composer: NotificationComposer,
    /// Current location.
    location: Arc<watch::Sender<String>>,
    /// Latest guard evaluation.
    guard: Arc<watch::Sender<GuardOutcome>>,
    /// Cancels every task.
    cancel: CancellationToken,
    /// Running tasks; `None` before start.
    tasks: Mutex<Option<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for ConsoleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleEngine")
            .field("location", &*self.location.borrow())
            .field("connected", &self.push.is_connected())
            .finish()
    }
}

impl ConsoleEngine {
    /// Wires the components. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: &AppConfig,
        api: Arc<dyn StaffApi>,
        connector: Arc<dyn PushConnector>,
        session: Arc<SessionStore>,
    ) -> Self {
        let manager = SessionManager::new(api.clone(), session.clone());
        let push = Arc::new(PushChannel::new(connector, config.push.clone()));
        let ledger = Arc::new(NotificationLedger::new(api.clone(), session.clone()));
        let revalidator = Arc::new(SessionRevalidator::new(
            api.clone(),
            session.clone(),
            config.session.clone(),
        ));
        let composer = NotificationComposer::new(api);

        let (location, _) = watch::channel("/".to_string());
        let (guard, _) = watch::channel(GuardOutcome {
            state: GuardState::Unknown,
            decision: RouteDecision::pending(),
            navigate: None,
        });

        info!("Console engine initialized");

        Self {
            session,
            manager,
            push,
            ledger,
            revalidator,
            composer,
            location: Arc::new(location),
            guard: Arc::new(guard),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(None),
        }
    }

    /// Spawns the push supervisor, the ledger follower, the revalidator,
    /// and the guard loop. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if tasks.is_some() {
            warn!("Console engine already started");
            return;
        }

        let handles = vec![
            tokio::spawn(
                self.push
                    .clone()
                    .run(self.session.subscribe(), self.cancel.child_token()),
            ),
            tokio::spawn(self.ledger.clone().run(
                self.session.subscribe(),
                self.push.subscribe(),
                self.cancel.child_token(),
            )),
            tokio::spawn(self.revalidator.clone().run(self.cancel.child_token())),
            tokio::spawn(run_guard(
                self.session.subscribe(),
                self.revalidator.subscribe(),
                self.location.clone(),
                self.guard.clone(),
                self.cancel.child_token(),
            )),
        ];
        *tasks = Some(handles);
        info!("Console engine started");
    }

    /// Cancels every task and waits for them to finish.
    pub async fn shutdown(&self) {
        info!("Shutting down console engine");
        self.cancel.cancel();

        let handles = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_default();
        for handle in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!("Console engine task panicked");
                }
            }
        }
        info!("Console engine shut down");
    }

    /// Moves to `path`; the guard re-evaluates.
    pub fn navigate(&self, path: impl Into<String>) {
        let path = path.into();
        debug!(path = %path, "Navigating");
        self.location.send_replace(path);
    }

    /// Current location.
    pub fn location(&self) -> String {
        self.location.borrow().clone()
    }

    /// Subscribe to location changes.
    pub fn subscribe_location(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }

    /// Latest guard evaluation.
    pub fn guard(&self) -> GuardOutcome {
        self.guard.borrow().clone()
    }

    /// Subscribe to guard evaluations.
    pub fn subscribe_guard(&self) -> watch::Receiver<GuardOutcome> {
        self.guard.subscribe()
    }

    /// Canonical session.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Login/logout flows.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Push channel.
    pub fn push(&self) -> &Arc<PushChannel> {
        &self.push
    }

    /// Notification cache.
    pub fn ledger(&self) -> &Arc<NotificationLedger> {
        &self.ledger
    }

    /// Session revalidation.
    pub fn revalidator(&self) -> &Arc<SessionRevalidator> {
        &self.revalidator
    }

    /// Outgoing notifications.
    pub fn composer(&self) -> &NotificationComposer {
        &self.composer
    }
}

/// Re-evaluates the guard on every session, revalidation, or location
/// change and applies issued redirects to the location.
async fn run_guard(
    mut session: watch::Receiver<SessionState>,
    mut revalidation: watch::Receiver<RevalidationStatus>,
    location: Arc<watch::Sender<String>>,
    outcome: Arc<watch::Sender<GuardOutcome>>,
    cancel: CancellationToken,
) {
    let mut guard = RouteGuard::new();
    let mut location_rx = location.subscribe();

    loop {
        let state = session.borrow_and_update().clone();
        let checking = *revalidation.borrow_and_update() == RevalidationStatus::Checking;
        let path = location_rx.borrow_and_update().clone();

        let result = guard.evaluate(GuardInput {
            identity: state.identity.as_ref(),
            path: &path,
            rehydrated: state.rehydrated,
            checking,
        });
        if let Some(target) = &result.navigate {
            info!(from = %path, to = %target, state = %result.state, "Route guard redirect");
            location.send_replace(target.clone());
        }
        outcome.send_replace(result);

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = revalidation.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = location_rx.changed() => {}
        }
    }

    debug!("Route guard loop stopped");
}
