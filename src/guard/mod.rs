//! Superadmin routing policy: the one reserved superadmin identity is always
//! steered into the restricted area; nobody else is ever blocked.
//!
//! The decision is a pure function so the policy is testable on its own; the
//! navigation side effect (and its timed hard fallback, which covers a soft
//! redirect that never lands) lives in a thin adapter around it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

/// Path prefix of the restricted area.
pub const RESTRICTED_AREA: &str = "/superadmin";

/// How long the soft redirect gets before the hard fallback fires.
pub const FALLBACK_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Render as-is; applies to every identity except a misplaced superadmin.
    Authorized,
    /// Navigate to the restricted area.
    Redirect { target: &'static str },
}

/// Pure routing policy: `(identity, current location) -> decision`.
pub fn decide(identity: Option<&str>, location: &str, superadmin: &str) -> RoutingDecision {
    match identity {
        Some(email)
            if email.eq_ignore_ascii_case(superadmin) && !in_restricted_area(location) =>
        {
            RoutingDecision::Redirect { target: RESTRICTED_AREA }
        }
        _ => RoutingDecision::Authorized,
    }
}

fn in_restricted_area(location: &str) -> bool {
    location == RESTRICTED_AREA || location.starts_with("/superadmin/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Authorized,
    Redirecting,
}

/// State machine driven by identity-change events.
#[derive(Debug)]
pub struct GuardSession {
    superadmin: String,
    state: GuardState,
}

impl GuardSession {
    pub fn new(superadmin: impl Into<String>) -> Self {
        Self { superadmin: superadmin.into(), state: GuardState::Checking }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Feed one identity-change event; returns the decision to apply.
    /// Idempotent: replaying the same event yields the same state.
    pub fn on_identity_change(
        &mut self,
        identity: Option<&str>,
        location: &str,
    ) -> RoutingDecision {
        let decision = decide(identity, location, &self.superadmin);
        self.state = match decision {
            RoutingDecision::Authorized => GuardState::Authorized,
            RoutingDecision::Redirect { .. } => GuardState::Redirecting,
        };
        decision
    }
}

/// Side-effect seam: how the adapter actually moves the client.
pub trait Navigator: Send + Sync {
    /// Soft navigation attempt; may silently lose a race and not land.
    fn navigate(&self, target: &str);
    /// Forced navigation; always lands.
    fn force_navigate(&self, target: &str);
    fn current_location(&self) -> String;
}

/// Apply a decision: soft redirect now, then a scheduled hard redirect if the
/// location still has not changed after [`FALLBACK_DELAY`].
pub fn apply_decision(decision: &RoutingDecision, navigator: Arc<dyn Navigator>) {
    let RoutingDecision::Redirect { target } = decision else {
        debug!("Routing decision: authorized, nothing to do");
        return;
    };

    info!("Redirecting superadmin to {}", target);
    navigator.navigate(target);

    let target = *target;
    tokio::spawn(async move {
        tokio::time::sleep(FALLBACK_DELAY).await;
        if !in_restricted_area(&navigator.current_location()) {
            info!("Soft redirect did not land, forcing navigation to {}", target);
            navigator.force_navigate(target);
        }
    });
}
