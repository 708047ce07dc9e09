//! Transport trait consumed by the session and notification components.

use async_trait::async_trait;

use fmiis_core::result::AppResult;
use fmiis_entity::{Employee, Identity, Notification};

use crate::types::SendNotificationRequest;

/// Request/response operations against the backend.
///
/// Implementations report transport failures with the kind that best
/// describes the HTTP outcome (`ServiceUnavailable`, `Authentication`,
/// `NotFound`, ...); callers re-tag them with their own component error
/// kind where the distinction matters.
#[async_trait]
pub trait StaffApi: Send + Sync + std::fmt::Debug + 'static {
    /// `POST /login`: exchange credentials for an identity.
    async fn login(&self, email: &str, password: &str) -> AppResult<Identity>;

    /// `POST /logout`: end the server-side session.
    async fn logout(&self) -> AppResult<()>;

    /// `GET /auth/me`: the identity the server currently associates with us.
    async fn whoami(&self) -> AppResult<Identity>;

    /// `GET /get-all-notifications/{email}`: the full notification set, server ordered.
    async fn notifications(&self, email: &str) -> AppResult<Vec<Notification>>;

    /// `POST /mark-notification-as-seen/{id}`: acknowledge a read.
    async fn mark_notification_seen(&self, notification_id: &str, email: &str) -> AppResult<()>;

    /// `POST /send-notification`: create a notification.
    async fn send_notification(
        &self,
        request: &SendNotificationRequest,
    ) -> AppResult<Notification>;

    /// `GET /get-all-employees`: the employee directory.
    async fn employees(&self) -> AppResult<Vec<Employee>>;
}
