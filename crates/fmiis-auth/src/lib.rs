//! # fmiis-auth
//!
//! Client-side session and authorization for the FMIIS console.
//!
//! ## Modules
//!
//! - `session`: the canonical identity (store), login/logout flows
//!   (manager), and server-side revalidation (revalidator)
//! - `guard`: the role-to-section route guard state machine and path helpers

pub mod guard;
pub mod session;

pub use guard::{DecisionStatus, GuardInput, GuardOutcome, GuardState, RouteDecision, RouteGuard};
pub use session::{
    ProbeOutcome, RevalidationStatus, SessionManager, SessionRevalidator, SessionState,
    SessionStore,
};
