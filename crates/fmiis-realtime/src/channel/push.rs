//! The push channel: one live connection per signed-in identity.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fmiis_auth::SessionState;
use fmiis_core::config::PushConfig;
use fmiis_core::events::push::{ChannelEvent, PushEvent};
use fmiis_entity::Identity;

use crate::connection::{ConnectionHandle, PushConnector};

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Starts at `initial` and doubles up to `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Back to the initial delay after a successful connect.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Live channel for server-initiated events, bound to the session.
///
/// [`PushChannel::run`] follows the session: it connects when an identity
/// appears, reconnects with backoff while it stays, switches connections
/// when the identity changes, and disconnects on logout. Consumers
/// [`subscribe`](PushChannel::subscribe) to a broadcast of
/// [`ChannelEvent`]s.
#[derive(Debug)]
pub struct PushChannel {
    /// Opens connections.
    connector: Arc<dyn PushConnector>,
    /// Channel configuration.
    config: PushConfig,
    /// Fan-out to consumers.
    events: broadcast::Sender<ChannelEvent>,
    /// Whether a connection is currently up.
    connected: Arc<AtomicBool>,
}

impl PushChannel {
    /// Creates an idle channel.
    pub fn new(connector: Arc<dyn PushConnector>, config: PushConfig) -> Self {
        let (events, _) = broadcast::channel(config.channel_buffer_size.max(1));
        Self {
            connector,
            config,
            events,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to connection state changes and server events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    /// Whether a connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Follows the session until cancelled, then releases the connection.
    pub async fn run(
        self: Arc<Self>,
        mut session: watch::Receiver<SessionState>,
        cancel: CancellationToken,
    ) {
        let mut active: Option<ConnectionHandle> = None;

        loop {
            let identity = session.borrow_and_update().identity.clone();
            active = self.reconcile(active, identity, &cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        if let Some(handle) = active.take() {
            handle.shutdown().await;
        }
        debug!("Push channel supervisor stopped");
    }

    /// Brings the active connection in line with `identity`.
    async fn reconcile(
        &self,
        active: Option<ConnectionHandle>,
        identity: Option<Identity>,
        cancel: &CancellationToken,
    ) -> Option<ConnectionHandle> {
        match (active, identity) {
            (Some(handle), Some(identity)) if handle.serves(&identity.email) => Some(handle),
            (active, identity) => {
                if let Some(handle) = active {
                    info!(email = %handle.email, "Closing push channel");
                    handle.shutdown().await;
                }
                identity.and_then(|identity| self.open(identity, cancel))
            }
        }
    }

    fn open(&self, identity: Identity, parent: &CancellationToken) -> Option<ConnectionHandle> {
        let Some(endpoint) = self.config.endpoint.clone().filter(|e| !e.trim().is_empty()) else {
            info!(email = %identity.email, "No push endpoint configured; push channel stays idle");
            return None;
        };

        let id = Uuid::new_v4();
        let cancel = parent.child_token();
        let task = ConnectionTask {
            id,
            endpoint,
            identity: identity.clone(),
            connector: self.connector.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            connected: self.connected.clone(),
        };
        info!(connection = %id, email = %identity.email, "Opening push channel");
        let join = tokio::spawn(task.run(cancel.clone()));
        Some(ConnectionHandle::new(id, identity.email, cancel, join))
    }
}

/// State owned by one connection task.
struct ConnectionTask {
    id: Uuid,
    endpoint: String,
    identity: Identity,
    connector: Arc<dyn PushConnector>,
    config: PushConfig,
    events: broadcast::Sender<ChannelEvent>,
    connected: Arc<AtomicBool>,
}

impl ConnectionTask {
    async fn run(self, cancel: CancellationToken) {
        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.reconnect_initial_ms),
            Duration::from_millis(self.config.reconnect_max_ms),
        );
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.connector.connect(&self.endpoint, &self.identity) => result,
            };

            match connected {
                Ok(mut connection) => {
                    backoff.reset();
                    attempt = 0;
                    self.set_connected(true);
                    info!(connection = %self.id, email = %self.identity.email, "Push channel connected");

                    let cancelled = loop {
                        tokio::select! {
                            _ = cancel.cancelled() => break true,
                            next = connection.next_event() => match next {
                                Ok(Some(raw)) => {
                                    debug!(connection = %self.id, event = %raw.name, "Push event received");
                                    let event = PushEvent::classify(&raw.name, raw.payload, &self.config);
                                    // No receivers is fine.
                                    let _ = self.events.send(ChannelEvent::Event(event));
                                }
                                Ok(None) => {
                                    info!(connection = %self.id, "Push channel closed by server");
                                    break false;
                                }
                                Err(e) => {
                                    warn!(connection = %self.id, error = %e, "Push channel connection lost");
                                    break false;
                                }
                            },
                        }
                    };

                    connection.close().await;
                    self.set_connected(false);
                    if cancelled {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        connection = %self.id,
                        attempt,
                        error = %e,
                        "Push channel connect failed"
                    );
                }
            }

            let delay = backoff.next_delay();
            debug!(connection = %self.id, delay_ms = delay.as_millis() as u64, "Push channel reconnect scheduled");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = time::sleep(delay) => {}
            }
        }

        debug!(connection = %self.id, "Push connection task stopped");
    }

    fn set_connected(&self, up: bool) {
        let was = self.connected.swap(up, Ordering::SeqCst);
        if was != up {
            let event = if up {
                ChannelEvent::Connected
            } else {
                ChannelEvent::Disconnected
            };
            let _ = self.events.send(event);
        }
    }
}
