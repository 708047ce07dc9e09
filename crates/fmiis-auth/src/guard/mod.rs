//! Role-to-section route guard.

pub mod machine;
pub mod policies;

pub use machine::{DecisionStatus, GuardInput, GuardOutcome, GuardState, RouteDecision, RouteGuard};
