//! Employee entity model.

use serde::{Deserialize, Serialize};

use crate::identity::Role;

/// A staff member as listed by the employee directory.
///
/// Only the fields needed to address notifications are modelled; the
/// record-management pages own the full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Backend employee identifier.
    #[serde(alias = "_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Assigned role.
    pub role: Role,
}

/// Envelope returned by `GET /get-all-employees`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeList {
    /// Every employee visible to the caller.
    #[serde(default)]
    pub employees: Vec<Employee>,
}
