//! Console sections: the top-level path prefix each role works under.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::role::Role;

/// A top-level area of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    /// `/dev`
    #[serde(rename = "dev")]
    Dev,
    /// `/glob`
    #[serde(rename = "glob")]
    Glob,
    /// `/gm-md`, shared by general managers and managing directors.
    #[serde(rename = "gm-md")]
    GmMd,
    /// `/hr`
    #[serde(rename = "hr")]
    Hr,
}

impl Section {
    /// The section a role is assigned to.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Dev => Self::Dev,
            Role::Glob => Self::Glob,
            Role::Gm | Role::Md => Self::GmMd,
            Role::Hr => Self::Hr,
        }
    }

    /// Path segment without the leading slash.
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Glob => "glob",
            Self::GmMd => "gm-md",
            Self::Hr => "hr",
        }
    }

    /// Absolute path prefix, e.g. `/gm-md`.
    pub fn prefix(&self) -> String {
        format!("/{}", self.segment())
    }

    /// Whether a role belongs to this section.
    pub fn contains(&self, role: Role) -> bool {
        Self::for_role(role) == *self
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment())
    }
}

impl FromStr for Section {
    type Err = fmiis_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('/').to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "glob" => Ok(Self::Glob),
            "gm-md" => Ok(Self::GmMd),
            "hr" => Ok(Self::Hr),
            _ => Err(fmiis_core::AppError::validation(format!(
                "Invalid section: '{s}'. Expected one of: dev, glob, gm-md, hr"
            ))),
        }
    }
}
