//! Identity entity model.

use serde::{Deserialize, Serialize};

use super::role::Role;
use super::section::Section;

/// The authenticated user's role-bearing profile.
///
/// Serialized with the backend's field names, which is also the form
/// mirrored to the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Backend user identifier.
    #[serde(alias = "_id")]
    pub id: String,
    /// Name shown in the console.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Login email; compared case-insensitively.
    pub email: String,
    /// Role that decides the assigned section.
    pub role: Role,
    /// Avatar image reference.
    #[serde(rename = "image", default)]
    pub avatar_ref: Option<String>,
}

impl Identity {
    /// Whether `email` refers to this identity.
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }

    /// The section this identity is assigned to.
    pub fn section(&self) -> Section {
        Section::for_role(self.role)
    }
}
