//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use fmiis_api::mock::MockStaffApi;
use fmiis_auth::SessionStore;
use fmiis_core::config::AppConfig;
use fmiis_core::error::AppError;
use fmiis_core::result::AppResult;
use fmiis_core::traits::store::DurableStore;
use fmiis_entity::{Identity, Notification, NotificationType, Receiver, Role, Sender};
use fmiis_realtime::{ConsoleEngine, PushConnection, PushConnector, RawEvent};
use fmiis_storage::memory::MemoryStore;

/// Push connector whose connections replay events sent by the test.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    refuse: Mutex<bool>,
    attempts: Mutex<Vec<String>>,
    feeds: Mutex<Vec<mpsc::UnboundedSender<RawEvent>>>,
}

#[derive(Debug)]
struct ScriptedConnection {
    feed: mpsc::UnboundedReceiver<RawEvent>,
}

#[async_trait]
impl PushConnector for ScriptedConnector {
    async fn connect(
        &self,
        _endpoint: &str,
        identity: &Identity,
    ) -> AppResult<Box<dyn PushConnection>> {
        self.attempts.lock().unwrap().push(identity.email.clone());
        if *self.refuse.lock().unwrap() {
            return Err(AppError::connection("refused"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().unwrap().push(tx);
        Ok(Box::new(ScriptedConnection { feed: rx }))
    }
}

#[async_trait]
impl PushConnection for ScriptedConnection {
    async fn next_event(&mut self) -> AppResult<Option<RawEvent>> {
        Ok(self.feed.recv().await)
    }

    async fn close(&mut self) {
        self.feed.close();
    }
}

impl ScriptedConnector {
    /// Emails of every connection attempt, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Refuse (or accept) further connection attempts.
    pub fn refuse(&self, refuse: bool) {
        *self.refuse.lock().unwrap() = refuse;
    }

    /// Push a named event down the newest connection.
    pub fn emit(&self, name: &str) {
        let feeds = self.feeds.lock().unwrap();
        feeds
            .last()
            .expect("no open push connection")
            .send(RawEvent::new(name, None))
            .expect("push connection already closed");
    }

    /// Whether the newest connection has been closed by the client.
    pub fn newest_closed(&self) -> bool {
        self.feeds
            .lock()
            .unwrap()
            .last()
            .is_none_or(|feed| feed.is_closed())
    }
}

/// An engine wired to the mock backend and the scripted push connector.
pub struct TestConsole {
    pub api: Arc<MockStaffApi>,
    pub connector: Arc<ScriptedConnector>,
    pub store: Arc<dyn DurableStore>,
    pub engine: ConsoleEngine,
}

impl TestConsole {
    /// Engine over an in-memory store, started but not yet rehydrated.
    pub fn new(api: Arc<MockStaffApi>) -> Self {
        Self::with_store(api, Arc::new(MemoryStore::new()), test_config())
    }

    /// Engine over a caller-supplied store and configuration.
    pub fn with_store(
        api: Arc<MockStaffApi>,
        store: Arc<dyn DurableStore>,
        config: AppConfig,
    ) -> Self {
        let connector = Arc::new(ScriptedConnector::default());
        let session = Arc::new(SessionStore::new(store.clone(), &config.session));
        let engine = ConsoleEngine::new(&config, api.clone(), connector.clone(), session);
        engine.start();
        Self {
            api,
            connector,
            store,
            engine,
        }
    }
}

/// Configuration with a push endpoint, fast reconnects, and no periodic probe.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.push.endpoint = Some("http://push.test".to_string());
    config.push.reconnect_initial_ms = 100;
    config.push.reconnect_max_ms = 400;
    config.session.revalidate_interval_seconds = 0;
    config
}

/// Let spawned tasks run; time is paused in every test.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn identity(email: &str, role: Role) -> Identity {
    Identity {
        id: format!("id-{email}"),
        display_name: email.split('@').next().unwrap_or(email).to_string(),
        email: email.to_string(),
        role,
        avatar_ref: None,
    }
}

/// A notification from management to `receivers`, each with its seen flag.
pub fn notification(id: &str, receivers: &[(&str, bool)]) -> Notification {
    let now = Utc::now();
    Notification {
        id: id.to_string(),
        kind: NotificationType::General,
        sender: Sender {
            id: "gm".to_string(),
            name: "GM".to_string(),
            email: "gm@x.com".to_string(),
            role: Role::Gm,
            avatar_ref: None,
        },
        receivers: receivers
            .iter()
            .map(|(email, seen)| Receiver {
                email: email.to_string(),
                name: email.to_string(),
                is_seen: *seen,
            })
            .collect(),
        content: format!("Notification {id}"),
        created_at: now,
        updated_at: now,
    }
}
