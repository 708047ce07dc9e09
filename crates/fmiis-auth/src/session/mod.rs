//! Session lifecycle: canonical identity, login/logout flows, revalidation.

pub mod manager;
pub mod revalidator;
pub mod store;

pub use manager::SessionManager;
pub use revalidator::{ProbeOutcome, RevalidationStatus, SessionRevalidator};
pub use store::{SessionState, SessionStore};
