//! Engine tunables.

use crate::synth::DEFAULT_ROUTE_PREFIX;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Run-wide settings of the [`Provisioner`](super::Provisioner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Public path segment routes are published under.
    pub route_prefix: String,
    pub ready_timeout_ms: u64,
    pub ready_poll_interval_ms: u64,
    /// Concurrent upserts within one provider.
    pub max_concurrent_upserts: usize,
    /// Providers processed at the same time.
    pub max_concurrent_providers: usize,
    /// Overall budget for the run, readiness wait included.
    pub run_deadline_ms: u64,
    /// Listing polls after apply; `0` disables verification.
    pub verify_attempts: u32,
    pub verify_interval_ms: u64,
    /// Synthesize only; no gateway calls.
    pub dry_run: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            ready_timeout_ms: 60_000,
            ready_poll_interval_ms: 2_000,
            max_concurrent_upserts: 4,
            max_concurrent_providers: 8,
            run_deadline_ms: 600_000,
            verify_attempts: 5,
            verify_interval_ms: 1_000,
            dry_run: false,
        }
    }
}

impl EngineSettings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_millis(self.run_deadline_ms)
    }

    pub fn verify_interval(&self) -> Duration {
        Duration::from_millis(self.verify_interval_ms)
    }
}
