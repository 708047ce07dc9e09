//! Route guard state machine.
//!
//! [`decide`] is a pure function of the session and location. [`RouteGuard`]
//! wraps it with the only piece of memory the guard needs: which redirect it
//! has already issued, so re-evaluating the same situation never navigates
//! twice.

use std::fmt;

use tracing::debug;

use fmiis_entity::{Identity, Role};

use super::policies::{home_path, is_within_section};

/// Root page; where signed-out users are sent.
pub const ROOT_PATH: &str = "/";

/// Guard state for one (session, location) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// The persisted session has not been read yet.
    Unknown,
    /// The server is confirming the session.
    Checking,
    /// No identity.
    Denied,
    /// The identity belongs to another section than `path`.
    Misplaced {
        /// Role of the signed-in identity.
        role: Role,
        /// Location that does not match it.
        path: String,
    },
    /// The page may render.
    Allowed,
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Checking => write!(f, "checking"),
            Self::Denied => write!(f, "denied"),
            Self::Misplaced { role, path } => write!(f, "misplaced({role}, {path})"),
            Self::Allowed => write!(f, "allowed"),
        }
    }
}

/// What a protected page should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStatus {
    /// Render a neutral placeholder.
    Pending,
    /// Render the page.
    Allow,
    /// Leave for `target`.
    Redirect,
}

/// Ephemeral routing decision; recomputed, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    /// Decision kind.
    pub status: DecisionStatus,
    /// Redirect target, set only for [`DecisionStatus::Redirect`].
    pub target: Option<String>,
}

impl RouteDecision {
    /// Placeholder decision.
    pub fn pending() -> Self {
        Self {
            status: DecisionStatus::Pending,
            target: None,
        }
    }

    /// Render the page.
    pub fn allow() -> Self {
        Self {
            status: DecisionStatus::Allow,
            target: None,
        }
    }

    /// Navigate to `target`.
    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            status: DecisionStatus::Redirect,
            target: Some(target.into()),
        }
    }

    /// Whether the page may render.
    pub fn is_allowed(&self) -> bool {
        self.status == DecisionStatus::Allow
    }
}

/// Everything the guard looks at.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    /// Signed-in identity.
    pub identity: Option<&'a Identity>,
    /// Current location.
    pub path: &'a str,
    /// Whether the session has been rehydrated.
    pub rehydrated: bool,
    /// Whether a revalidation probe is in flight.
    pub checking: bool,
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    /// State entered.
    pub state: GuardState,
    /// Decision for the page.
    pub decision: RouteDecision,
    /// Navigation to perform now; `None` when the redirect was already
    /// issued for this identity and path, or there is nothing to do.
    pub navigate: Option<String>,
}

/// Computes the state and decision without side effects.
pub fn decide(input: &GuardInput<'_>) -> (GuardState, RouteDecision) {
    if !input.rehydrated {
        return (GuardState::Unknown, RouteDecision::pending());
    }

    let Some(identity) = input.identity else {
        // The root page is public; nothing to leave for.
        if is_root(input.path) {
            return (GuardState::Denied, RouteDecision::pending());
        }
        return (GuardState::Denied, RouteDecision::redirect(ROOT_PATH));
    };

    if input.checking {
        return (GuardState::Checking, RouteDecision::pending());
    }

    if is_within_section(identity.role, input.path) {
        return (GuardState::Allowed, RouteDecision::allow());
    }

    (
        GuardState::Misplaced {
            role: identity.role,
            path: input.path.to_string(),
        },
        RouteDecision::redirect(home_path(identity.role)),
    )
}

fn is_root(path: &str) -> bool {
    path.split(['?', '#'])
        .next()
        .is_none_or(|p| p.trim_matches('/').is_empty())
}

/// Key a redirect is issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IssuedRedirect {
    email: Option<String>,
    role: Option<Role>,
    path: String,
}

impl IssuedRedirect {
    fn new(input: &GuardInput<'_>) -> Self {
        Self {
            email: input.identity.map(|i| i.email.to_lowercase()),
            role: input.identity.map(|i| i.role),
            path: input.path.to_string(),
        }
    }
}

/// Stateful guard shared by every protected page.
#[derive(Debug, Default)]
pub struct RouteGuard {
    /// Last redirect handed out.
    issued: Option<IssuedRedirect>,
    /// Last state entered.
    state: Option<GuardState>,
}

impl RouteGuard {
    /// Creates a guard in the `unknown` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The state of the most recent evaluation.
    pub fn state(&self) -> GuardState {
        self.state.clone().unwrap_or(GuardState::Unknown)
    }

    /// Evaluates the guard and decides whether to navigate.
    pub fn evaluate(&mut self, input: GuardInput<'_>) -> GuardOutcome {
        let (state, decision) = decide(&input);

        let navigate = match &decision.target {
            Some(target) if decision.status == DecisionStatus::Redirect => {
                let key = IssuedRedirect::new(&input);
                if target == input.path || self.issued.as_ref() == Some(&key) {
                    None
                } else {
                    debug!(from = input.path, to = %target, state = %state, "Issuing redirect");
                    self.issued = Some(key);
                    Some(target.clone())
                }
            }
            _ => {
                self.issued = None;
                None
            }
        };

        self.state = Some(state.clone());
        GuardOutcome {
            state,
            decision,
            navigate,
        }
    }
}
