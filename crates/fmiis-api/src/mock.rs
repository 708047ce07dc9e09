//! Scripted in-memory [`StaffApi`] for tests.
//!
//! Every response can be replaced at any time, optional delays let tests
//! hold a request in flight, and every call is recorded.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use fmiis_core::error::AppError;
use fmiis_core::result::AppResult;
use fmiis_entity::{Employee, Identity, Notification, Sender};

use crate::client::StaffApi;
use crate::types::SendNotificationRequest;

#[derive(Debug, Default)]
struct MockState {
    login: Option<Identity>,
    whoami: VecDeque<AppResult<Identity>>,
    whoami_default: Option<Identity>,
    whoami_delay: Option<Duration>,
    notifications: Vec<Notification>,
    fail_fetch: bool,
    fetch_delay: Option<Duration>,
    fail_acks: bool,
    ack_delay: Option<Duration>,
    fail_logout: bool,
    employees: Vec<Employee>,
    fetches: Vec<String>,
    acks: Vec<(String, String)>,
    sent: Vec<SendNotificationRequest>,
    whoami_calls: usize,
    logout_calls: usize,
}

/// In-memory stand-in for the backend.
#[derive(Debug, Default)]
pub struct MockStaffApi {
    state: Mutex<MockState>,
}

impl MockStaffApi {
    /// Create a mock with empty responses.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Identity returned by `login` (any credentials are accepted when set).
    pub fn set_login(&self, identity: Option<Identity>) {
        self.with_state(|s| s.login = identity);
    }

    /// Identity `whoami` answers with once the queued answers are used up.
    pub fn set_whoami(&self, identity: Option<Identity>) {
        self.with_state(|s| s.whoami_default = identity);
    }

    /// Queue a single `whoami` answer.
    pub fn push_whoami(&self, result: AppResult<Identity>) {
        self.with_state(|s| s.whoami.push_back(result));
    }

    /// Delay every `whoami` call.
    pub fn set_whoami_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.whoami_delay = delay);
    }

    /// Notification list returned by `notifications`.
    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        self.with_state(|s| s.notifications = notifications);
    }

    /// Make `notifications` fail.
    pub fn fail_fetch(&self, fail: bool) {
        self.with_state(|s| s.fail_fetch = fail);
    }

    /// Delay every `notifications` call.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.fetch_delay = delay);
    }

    /// Make `mark_notification_seen` fail.
    pub fn fail_acks(&self, fail: bool) {
        self.with_state(|s| s.fail_acks = fail);
    }

    /// Delay every `mark_notification_seen` call.
    pub fn set_ack_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.ack_delay = delay);
    }

    /// Make `logout` fail.
    pub fn fail_logout(&self, fail: bool) {
        self.with_state(|s| s.fail_logout = fail);
    }

    /// Employee directory returned by `employees`.
    pub fn set_employees(&self, employees: Vec<Employee>) {
        self.with_state(|s| s.employees = employees);
    }

    /// Emails passed to `notifications`, in call order.
    pub fn fetches(&self) -> Vec<String> {
        self.with_state(|s| s.fetches.clone())
    }

    /// `(notification_id, email)` pairs passed to `mark_notification_seen`.
    pub fn acks(&self) -> Vec<(String, String)> {
        self.with_state(|s| s.acks.clone())
    }

    /// Requests passed to `send_notification`.
    pub fn sent(&self) -> Vec<SendNotificationRequest> {
        self.with_state(|s| s.sent.clone())
    }

    /// Number of `whoami` calls.
    pub fn whoami_calls(&self) -> usize {
        self.with_state(|s| s.whoami_calls)
    }

    /// Number of `logout` calls.
    pub fn logout_calls(&self) -> usize {
        self.with_state(|s| s.logout_calls)
    }
}

#[async_trait]
impl StaffApi for MockStaffApi {
    async fn login(&self, _email: &str, _password: &str) -> AppResult<Identity> {
        self.with_state(|s| s.login.clone())
            .ok_or_else(|| AppError::authentication("Invalid credentials"))
    }

    async fn logout(&self) -> AppResult<()> {
        let fail = self.with_state(|s| {
            s.logout_calls += 1;
            s.fail_logout
        });
        if fail {
            return Err(AppError::service_unavailable("logout failed"));
        }
        Ok(())
    }

    async fn whoami(&self) -> AppResult<Identity> {
        let (result, delay) = self.with_state(|s| {
            s.whoami_calls += 1;
            let result = match s.whoami.pop_front() {
                Some(result) => result,
                None => s
                    .whoami_default
                    .clone()
                    .ok_or_else(|| AppError::authentication("Not authenticated")),
            };
            (result, s.whoami_delay)
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn notifications(&self, email: &str) -> AppResult<Vec<Notification>> {
        let delay = self.with_state(|s| {
            s.fetches.push(email.to_string());
            s.fetch_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| {
            if s.fail_fetch {
                Err(AppError::service_unavailable("backend unavailable"))
            } else {
                Ok(s.notifications.clone())
            }
        })
    }

    async fn mark_notification_seen(&self, notification_id: &str, email: &str) -> AppResult<()> {
        let delay = self.with_state(|s| {
            s.acks
                .push((notification_id.to_string(), email.to_string()));
            s.ack_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.with_state(|s| s.fail_acks) {
            return Err(AppError::service_unavailable("ack rejected"));
        }
        Ok(())
    }

    async fn send_notification(
        &self,
        request: &SendNotificationRequest,
    ) -> AppResult<Notification> {
        let index = self.with_state(|s| {
            s.sent.push(request.clone());
            s.sent.len()
        });
        let now = Utc::now();
        Ok(Notification {
            id: format!("sent-{index}"),
            kind: request.noti_type,
            sender: Sender {
                id: String::new(),
                name: request.sender.name.clone(),
                email: request.sender.email.clone(),
                role: request.sender.role,
                avatar_ref: None,
            },
            receivers: request.receivers.clone(),
            content: request.content.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn employees(&self) -> AppResult<Vec<Employee>> {
        Ok(self.with_state(|s| s.employees.clone()))
    }
}
