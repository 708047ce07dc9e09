//! # fmiis-entity
//!
//! Domain entity models for the FMIIS console. Every struct in this crate
//! is a value object exchanged with the backend or persisted locally. All
//! entities derive `Debug`, `Clone`, `Serialize`, and `Deserialize`; the
//! serde attributes carry the backend's wire field names.

pub mod employee;
pub mod identity;
pub mod notification;

pub use employee::Employee;
pub use identity::{Identity, Role, Section};
pub use notification::{Notification, NotificationType, Receiver, Sender};
