//! Notification type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of notification types the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    /// Daily morning meeting.
    #[serde(rename = "Morning Meeting")]
    MorningMeeting,
    /// Developer meeting.
    #[serde(rename = "Developer Meeting")]
    DeveloperMeeting,
    /// Kosugi meeting.
    #[serde(rename = "Kosugi Meeting")]
    KosugiMeeting,
    /// Emergency meeting.
    #[serde(rename = "Emergency Meeting")]
    EmergencyMeeting,
    /// Internal meeting.
    #[serde(rename = "Internal Meeting")]
    InternalMeeting,
    /// General announcement.
    #[serde(rename = "General")]
    General,
}

impl NotificationType {
    /// Every type, in the order the send form offers them.
    pub const ALL: [NotificationType; 6] = [
        Self::MorningMeeting,
        Self::DeveloperMeeting,
        Self::KosugiMeeting,
        Self::EmergencyMeeting,
        Self::InternalMeeting,
        Self::General,
    ];

    /// Return the wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MorningMeeting => "Morning Meeting",
            Self::DeveloperMeeting => "Developer Meeting",
            Self::KosugiMeeting => "Kosugi Meeting",
            Self::EmergencyMeeting => "Emergency Meeting",
            Self::InternalMeeting => "Internal Meeting",
            Self::General => "General",
        }
    }

    /// Whether this type announces a meeting.
    pub fn is_meeting(&self) -> bool {
        !matches!(self, Self::General)
    }

    /// Whether this type is urgent.
    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::EmergencyMeeting)
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = fmiis_core::AppError;

    /// Accepts the wire label or a compact form such as `emergency-meeting`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| {
                t.as_str()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_lowercase()
                    == normalized
            })
            .ok_or_else(|| {
                fmiis_core::AppError::validation(format!("Invalid notification type: '{s}'"))
            })
    }
}
