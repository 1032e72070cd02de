//! Per-provider provisioning state machine.
//!
//! ```text
//! PENDING → VALIDATING → FETCHING → SYNTHESIZING → APPLYING ─┬→ SUCCEEDED
//!              │            │            │                   ├→ PARTIAL
//!              └────────────┴────────────┴──→ FAILED         ├→ ROLLED_BACK
//!                                        └→ PLANNED (dry run) └→ FAILED
//! ```
//!
//! Any non-terminal phase may also move to `FAILED` when the run deadline
//! expires.

use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a single provider within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderPhase {
    Pending,
    Validating,
    Fetching,
    Synthesizing,
    Applying,
    Succeeded,
    Partial,
    RolledBack,
    Failed,
    /// Dry run: routes synthesized, nothing applied.
    Planned,
}

impl ProviderPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProviderPhase::Succeeded
                | ProviderPhase::Partial
                | ProviderPhase::RolledBack
                | ProviderPhase::Failed
                | ProviderPhase::Planned
        )
    }

    /// Terminal phases that satisfy the run-level success criterion.
    pub fn counts_as_success(&self) -> bool {
        matches!(
            self,
            ProviderPhase::Succeeded | ProviderPhase::Partial | ProviderPhase::Planned
        )
    }

    /// Whether `self → next` is an edge of the state machine.
    pub fn can_transition_to(&self, next: ProviderPhase) -> bool {
        use ProviderPhase::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Pending, Validating)
                | (Validating, Fetching)
                | (Fetching, Synthesizing)
                | (Synthesizing, Applying)
                | (Synthesizing, Planned)
                | (Applying, Succeeded)
                | (Applying, Partial)
                | (Applying, RolledBack)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderPhase::Pending => "PENDING",
            ProviderPhase::Validating => "VALIDATING",
            ProviderPhase::Fetching => "FETCHING",
            ProviderPhase::Synthesizing => "SYNTHESIZING",
            ProviderPhase::Applying => "APPLYING",
            ProviderPhase::Succeeded => "SUCCEEDED",
            ProviderPhase::Partial => "PARTIAL",
            ProviderPhase::RolledBack => "ROLLED_BACK",
            ProviderPhase::Failed => "FAILED",
            ProviderPhase::Planned => "PLANNED",
        }
    }
}

impl fmt::Display for ProviderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route whose upsert failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFailure {
    pub route_id: String,
    /// `METHOD path` of the operation.
    pub operation: String,
    /// Raw gateway status code; `None` for network-level failures.
    pub status: Option<u16>,
    pub message: String,
}

/// Run record of one provider.  Mutated only by the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningState {
    pub provider_id: String,
    pub phase: ProviderPhase,
    /// Route ids whose upsert was issued.
    pub attempted: Vec<String>,
    /// Route ids the gateway accepted.
    pub succeeded: Vec<String>,
    pub failed: Vec<RouteFailure>,
    pub rolled_back: bool,
}

impl ProvisioningState {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            phase: ProviderPhase::Pending,
            attempted: Vec::new(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            rolled_back: false,
        }
    }

    /// Move to `next`, rejecting edges that are not part of the state machine.
    pub fn advance(&mut self, next: ProviderPhase) -> Result<(), ProvisionError> {
        if !self.phase.can_transition_to(next) {
            return Err(ProvisionError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!(provider = %self.provider_id, from = %self.phase, to = %next, "provider phase");
        self.phase = next;
        Ok(())
    }

    pub fn record_attempt(&mut self, route_id: impl Into<String>) {
        self.attempted.push(route_id.into());
    }

    pub fn record_success(&mut self, route_id: impl Into<String>) {
        self.succeeded.push(route_id.into());
    }

    pub fn record_failure(&mut self, failure: RouteFailure) {
        self.failed.push(failure);
    }

    /// Failed upserts divided by attempted upserts; `0.0` when nothing was attempted.
    pub fn failure_ratio(&self) -> f64 {
        if self.attempted.is_empty() {
            return 0.0;
        }
        self.failed.len() as f64 / self.attempted.len() as f64
    }

    /// Outcome of the APPLYING phase.
    ///
    /// - no failures → `SUCCEEDED`
    /// - failure ratio ≤ 50% → `PARTIAL`
    /// - failure ratio > 50% → `ROLLED_BACK`
    ///
    /// Integer arithmetic keeps the 50% boundary exact.
    pub fn apply_outcome(&self) -> ProviderPhase {
        let failed = self.failed.len();
        if failed == 0 {
            ProviderPhase::Succeeded
        } else if failed * 2 > self.attempted.len() {
            ProviderPhase::RolledBack
        } else {
            ProviderPhase::Partial
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(id: &str) -> RouteFailure {
        RouteFailure {
            route_id: id.into(),
            operation: "GET /x".into(),
            status: Some(400),
            message: "bad".into(),
        }
    }

    fn state_with(attempted: usize, failed: usize) -> ProvisioningState {
        let mut state = ProvisioningState::new("p");
        for i in 0..attempted {
            let id = format!("r{i}");
            state.record_attempt(id.clone());
            if i < failed {
                state.record_failure(failure(&id));
            } else {
                state.record_success(id);
            }
        }
        state
    }

    #[test]
    fn happy_path_transitions_are_allowed() {
        let mut state = ProvisioningState::new("p");
        for next in [
            ProviderPhase::Validating,
            ProviderPhase::Fetching,
            ProviderPhase::Synthesizing,
            ProviderPhase::Applying,
            ProviderPhase::Succeeded,
        ] {
            state.advance(next).unwrap();
        }
        assert_eq!(state.phase, ProviderPhase::Succeeded);
    }

    #[test]
    fn skipping_phases_is_rejected() {
        let mut state = ProvisioningState::new("p");
        let err = state.advance(ProviderPhase::Applying).unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::InvalidTransition {
                from: ProviderPhase::Pending,
                to: ProviderPhase::Applying
            }
        ));
        assert_eq!(state.phase, ProviderPhase::Pending);
    }

    #[test]
    fn terminal_phases_are_final() {
        let mut state = ProvisioningState::new("p");
        state.advance(ProviderPhase::Validating).unwrap();
        state.advance(ProviderPhase::Failed).unwrap();
        assert!(state.advance(ProviderPhase::Failed).is_err());
        assert!(state.advance(ProviderPhase::Fetching).is_err());
    }

    #[test]
    fn any_running_phase_can_fail() {
        for phase in [
            ProviderPhase::Pending,
            ProviderPhase::Validating,
            ProviderPhase::Fetching,
            ProviderPhase::Synthesizing,
            ProviderPhase::Applying,
        ] {
            assert!(phase.can_transition_to(ProviderPhase::Failed), "{phase}");
        }
    }

    #[test]
    fn apply_outcome_follows_failure_ratio() {
        assert_eq!(state_with(4, 0).apply_outcome(), ProviderPhase::Succeeded);
        assert_eq!(state_with(4, 1).apply_outcome(), ProviderPhase::Partial);
        // Exactly 50% stays partial.
        assert_eq!(state_with(4, 2).apply_outcome(), ProviderPhase::Partial);
        assert_eq!(state_with(4, 3).apply_outcome(), ProviderPhase::RolledBack);
        assert_eq!(state_with(1, 1).apply_outcome(), ProviderPhase::RolledBack);
    }

    #[test]
    fn failure_ratio_is_failed_over_attempted() {
        assert_eq!(ProvisioningState::new("p").failure_ratio(), 0.0);
        assert!((state_with(4, 1).failure_ratio() - 0.25).abs() < f64::EPSILON);
        assert!((state_with(4, 3).failure_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_serializes_in_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProviderPhase::RolledBack).unwrap(),
            "\"ROLLED_BACK\""
        );
        assert_eq!(ProviderPhase::RolledBack.to_string(), "ROLLED_BACK");
    }
}
