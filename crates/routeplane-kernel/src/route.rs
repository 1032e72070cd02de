//! Route definitions submitted to the gateway.
//!
//! A [`RouteDefinition`] is keyed by a deterministic [`route_id`], so
//! re-provisioning the same operation always targets the same gateway
//! object and an upsert replaces it instead of creating a duplicate.

use crate::operation::HttpMethod;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Number of hex characters of the digest kept in a route id.
const ROUTE_ID_HASH_LEN: usize = 12;

/// Derive the stable gateway id of the route for `(provider_id, method, path)`.
///
/// Format: `<provider-id>-<method>-<12 hex chars>` where the hex suffix is the
/// SHA-256 of `provider_id NUL METHOD NUL path`.  The function is pure: same
/// inputs, byte-identical output, across runs and hosts.
pub fn route_id(provider_id: &str, method: HttpMethod, path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(method.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(path.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!(
        "{}-{}-{}",
        provider_id,
        method.as_str().to_ascii_lowercase(),
        &digest[..ROUTE_ID_HASH_LEN]
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Components
// ─────────────────────────────────────────────────────────────────────────────

/// Capture-and-replace transform applied to the public URI before proxying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Regex matched against the public URI; group 1 captures the upstream remainder.
    pub pattern: String,
    /// Replacement, referencing the capture as `$1`.
    pub replacement: String,
}

/// Where the gateway forwards matched requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamTarget {
    /// `http` or `https`.
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl UpstreamTarget {
    /// `host:port`, the node key used by the gateway.
    pub fn node(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RouteDefinition
// ─────────────────────────────────────────────────────────────────────────────

/// The unit submitted to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Deterministic id, see [`route_id`].
    pub route_id: String,
    /// Provider the route belongs to.
    pub provider_id: String,
    /// Operation id from the description document.
    pub operation_id: String,
    /// Method the route accepts.
    pub method: HttpMethod,
    /// Original upstream path template.
    pub upstream_path: String,
    /// Public-facing URI, e.g. `/gw/acme-1/v1/models/*`.
    pub match_pattern: String,
    pub rewrite_rule: RewriteRule,
    pub upstream_target: UpstreamTarget,
    /// Headers set on the proxied request (authentication).
    pub injected_headers: BTreeMap<String, String>,
}

impl RouteDefinition {
    /// Copy with every injected header value masked, for printing and snapshots.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for value in copy.injected_headers.values_mut() {
            *value = "***".to_string();
        }
        copy
    }

    /// `METHOD path`, used in logs and reports.
    pub fn operation_label(&self) -> String {
        format!("{} {}", self.method, self.upstream_path)
    }
}
