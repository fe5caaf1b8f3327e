//! Verification engine combining the cooldown gate and membership oracle.
//!
//! This is the core access decision for channel-gate.

use crate::access::cooldown::{CooldownDecision, CooldownGate};
use crate::access::oracle::{MembershipOracle, MembershipResult};
use crate::access::{GroupId, RequesterId};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default cooldown between verification attempts of one requester.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);

/// Configuration for the verification engine.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// The two groups a requester must belong to.
    pub groups: [GroupId; 2],
    /// Minimum time between verification attempts of one requester.
    pub cooldown: Duration,
}

/// Outcome of a verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Member of both groups.
    Authorized,
    /// Both checks resolved and at least one is not a membership.
    Denied,
    /// Attempted again inside the cooldown window; no query was made.
    RateLimited {
        /// Time left until a new attempt is accepted.
        retry_after: Duration,
    },
    /// At least one check could not be resolved.
    OracleFailure {
        /// Operator-facing description, never shown to the requester.
        detail: String,
    },
}

impl VerificationOutcome {
    /// Short label for logs and events.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Denied => "denied",
            Self::RateLimited { .. } => "rate_limited",
            Self::OracleFailure { .. } => "oracle_failure",
        }
    }
}

/// Decide the outcome of two resolved group checks.
///
/// Any `Unknown` wins over `NotMember`, so a requester is told "check failed"
/// only when a check could not be resolved at all.
#[must_use]
pub fn decide(groups: [GroupId; 2], results: [MembershipResult; 2]) -> VerificationOutcome {
    let unresolved: Vec<String> = groups
        .iter()
        .zip(results)
        .filter(|(_, result)| *result == MembershipResult::Unknown)
        .map(|(group, _)| group.to_string())
        .collect();

    if !unresolved.is_empty() {
        return VerificationOutcome::OracleFailure {
            detail: format!("membership unresolved for group(s) {}", unresolved.join(", ")),
        };
    }

    if results.iter().all(|r| *r == MembershipResult::Member) {
        VerificationOutcome::Authorized
    } else {
        VerificationOutcome::Denied
    }
}

/// Decides whether a requester is currently authorized.
///
/// Constructed once per process and shared by reference across tasks.
pub struct VerificationEngine {
    gate: CooldownGate,
    oracle: MembershipOracle,
    config: VerificationConfig,
}

impl VerificationEngine {
    /// Create a new engine.
    #[must_use]
    pub fn new(oracle: MembershipOracle, config: VerificationConfig) -> Self {
        info!(
            "Verification engine initialized (groups={:?}, cooldown={:?})",
            config.groups, config.cooldown
        );
        Self {
            gate: CooldownGate::new(),
            oracle,
            config,
        }
    }

    /// Verify `id` against both required groups.
    ///
    /// The cooldown is consumed before any query, so an attempt counts against
    /// the rate limit even when the oracle later fails.
    pub async fn verify(&self, id: RequesterId) -> VerificationOutcome {
        if let CooldownDecision::Denied { retry_after } = self.gate.try_acquire(id, self.config.cooldown) {
            return VerificationOutcome::RateLimited { retry_after };
        }

        let [first, second] = self.config.groups;
        let (a, b) = tokio::join!(
            self.oracle.check_membership(first, id),
            self.oracle.check_membership(second, id),
        );

        let outcome = decide(self.config.groups, [a, b]);
        match &outcome {
            VerificationOutcome::OracleFailure { detail } => {
                warn!("Verification of {id} failed: {detail}");
            }
            other => debug!("Verification of {id}: {}", other.label()),
        }
        outcome
    }

    /// The cooldown gate, for periodic sweeping.
    #[must_use]
    pub fn cooldown_gate(&self) -> &CooldownGate {
        &self.gate
    }

    /// The configured groups.
    #[must_use]
    pub fn groups(&self) -> [GroupId; 2] {
        self.config.groups
    }
}
