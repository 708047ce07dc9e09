//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::NotificationType;
use crate::identity::Role;

/// The staff member who sent a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Backend user identifier.
    #[serde(default, alias = "_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Role at the time of sending.
    pub role: Role,
    /// Avatar image reference.
    #[serde(rename = "image", default)]
    pub avatar_ref: Option<String>,
}

/// One addressee of a notification and their read state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    /// Email address; unique within one notification.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Whether this receiver has opened the notification.
    #[serde(default)]
    pub is_seen: bool,
}

impl Receiver {
    /// Create an unseen receiver entry.
    pub fn unseen(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            is_seen: false,
        }
    }
}

/// A notification as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Backend notification identifier.
    #[serde(default, alias = "_id")]
    pub id: String,
    /// Notification type.
    #[serde(rename = "noti_type")]
    pub kind: NotificationType,
    /// Sender profile.
    pub sender: Sender,
    /// Ordered addressees.
    #[serde(default)]
    pub receivers: Vec<Receiver>,
    /// Body text; may embed URLs.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// The receiver entry for `email`, compared case-insensitively.
    pub fn receiver_for(&self, email: &str) -> Option<&Receiver> {
        self.receivers
            .iter()
            .find(|r| r.email.eq_ignore_ascii_case(email))
    }

    /// Mutable receiver entry for `email`.
    pub fn receiver_for_mut(&mut self, email: &str) -> Option<&mut Receiver> {
        self.receivers
            .iter_mut()
            .find(|r| r.email.eq_ignore_ascii_case(email))
    }

    /// Whether `email` is a receiver that has not seen this notification.
    pub fn is_unseen_by(&self, email: &str) -> bool {
        self.receiver_for(email).is_some_and(|r| !r.is_seen)
    }

    /// First `words` words of the content, for list views.
    pub fn preview(&self, words: usize) -> String {
        let mut parts = self.content.split_whitespace();
        let head: Vec<&str> = parts.by_ref().take(words).collect();
        if parts.next().is_some() {
            format!("{}...", head.join(" "))
        } else {
            head.join(" ")
        }
    }
}
