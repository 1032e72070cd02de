//! Run report: what the command prints and what `--snapshot` persists.

use routeplane_kernel::{ProviderPhase, ProvisioningState, RouteDefinition, TrustMode};
use serde::{Deserialize, Serialize};

/// Final record of one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReport {
    pub state: ProvisioningState,
    /// Error that ended the provider, if any.
    pub error: Option<String>,
    /// Error class, e.g. `FetchError`.
    pub error_kind: Option<String>,
    /// Trust mode of the description-document fetch, when one happened.
    pub trust: Option<TrustMode>,
    /// Outcome of post-run verification; `None` when it did not run.
    pub verified: Option<bool>,
    /// Synthesized routes (header values masked).  Populated in dry runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planned_routes: Vec<RouteDefinition>,
}

impl ProviderReport {
    pub fn provider_id(&self) -> &str {
        &self.state.provider_id
    }

    pub fn phase(&self) -> ProviderPhase {
        self.state.phase
    }
}

/// Outcome of a whole provisioning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub providers: Vec<ProviderReport>,
    /// Ids of entries with `enabled: false`.
    pub disabled: Vec<String>,
    /// Run-fatal error (readiness timeout, deadline expiry).
    pub fatal: Option<String>,
    pub duration_ms: u64,
}

impl RunReport {
    /// `true` when nothing was run-fatal and at least one provider reached
    /// `SUCCEEDED` or `PARTIAL` (`PLANNED` in a dry run).
    pub fn succeeded(&self) -> bool {
        self.fatal.is_none()
            && self
                .providers
                .iter()
                .any(|p| p.phase().counts_as_success())
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderReport> {
        self.providers.iter().find(|p| p.provider_id() == provider_id)
    }

    /// Number of providers in `phase`.
    pub fn count(&self, phase: ProviderPhase) -> usize {
        self.providers.iter().filter(|p| p.phase() == phase).count()
    }
}
