//! Request and response bodies.

use serde::{Deserialize, Serialize};

use fmiis_entity::{Identity, NotificationType, Receiver, Role};

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Login email.
    pub email: &'a str,
    /// Plain-text password; only ever sent over the configured transport.
    pub password: &'a str,
}

/// Body of `POST /mark-notification-as-seen/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct MarkSeenRequest<'a> {
    /// Email of the receiver who read the notification.
    pub email: &'a str,
}

/// Sender block of a send-notification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSenderRef {
    /// Sender display name.
    pub name: String,
    /// Sender email.
    pub email: String,
    /// Sender role.
    pub role: Role,
}

/// Body of `POST /send-notification`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendNotificationRequest {
    /// Notification type.
    pub noti_type: NotificationType,
    /// Who is sending.
    pub sender: NotificationSenderRef,
    /// Addressees, all unseen.
    pub receivers: Vec<Receiver>,
    /// Body text.
    pub content: String,
}

/// `GET /auth/me` answers either with the identity or with `{ "user": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WhoamiResponse {
    /// Wrapped form.
    Wrapped {
        /// The identity.
        user: Identity,
    },
    /// Bare identity.
    Bare(Identity),
}

impl WhoamiResponse {
    pub(crate) fn into_identity(self) -> Identity {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}
