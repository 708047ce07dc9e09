//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Developer.
    Dev,
    /// Global staff.
    Glob,
    /// General manager.
    Gm,
    /// Managing director.
    Md,
    /// Human resources.
    Hr,
}

impl Role {
    /// Every role, in a stable order.
    pub const ALL: [Role; 5] = [Self::Dev, Self::Glob, Self::Gm, Self::Md, Self::Hr];

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Glob => "glob",
            Self::Gm => "gm",
            Self::Md => "md",
            Self::Hr => "hr",
        }
    }

    /// Whether this role may send notifications to other staff.
    pub fn can_send_notifications(&self) -> bool {
        matches!(self, Self::Gm | Self::Md | Self::Hr)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = fmiis_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "glob" => Ok(Self::Glob),
            "gm" => Ok(Self::Gm),
            "md" => Ok(Self::Md),
            "hr" => Ok(Self::Hr),
            _ => Err(fmiis_core::AppError::validation(format!(
                "Invalid role: '{s}'. Expected one of: dev, glob, gm, md, hr"
            ))),
        }
    }
}
