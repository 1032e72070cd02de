//! Configuration file model, loading and validation.
//!
//! ```yaml
//! gateway:
//!   admin_url: http://127.0.0.1:9180
//!   admin_key: ${GATEWAY_ADMIN_KEY}
//! fetch:
//!   timeout_ms: 15000
//! provisioning:
//!   max_concurrent_upserts: 4
//! providers:
//!   - id: acme-1
//!     base_url: https://api.acme.test
//!     auth_type: bearer
//!     token: ${ACME_TOKEN}
//! ```

pub mod loader;
pub mod validator;

pub use loader::load;
pub use validator::{ConfigValidationResult, ConfigValidator};

use routeplane_kernel::RawProviderConfig;
use routeplane_provisioner::admin::AdminClientConfig;
use routeplane_provisioner::engine::EngineSettings;
use routeplane_provisioner::spec::FetchConfig;
use routeplane_provisioner::synth::DEFAULT_ROUTE_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteplaneConfig {
    pub gateway: GatewayConfig,
    pub fetch: FetchConfig,
    pub provisioning: ProvisioningConfig,
    pub providers: Vec<RawProviderConfig>,
}

/// `gateway` section: administrative API access and public routing.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub admin_url: String,
    pub admin_key: String,
    pub admin_key_header: String,
    pub routes_path: String,
    /// Public path segment routes are published under.
    pub route_prefix: String,
    pub request_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub ready_poll_interval_ms: u64,
    pub max_retries: usize,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let admin = AdminClientConfig::default();
        let engine = EngineSettings::default();
        Self {
            admin_url: admin.admin_url,
            admin_key: admin.admin_key,
            admin_key_header: admin.admin_key_header,
            routes_path: admin.routes_path,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            request_timeout_ms: admin.request_timeout_ms,
            ready_timeout_ms: engine.ready_timeout_ms,
            ready_poll_interval_ms: engine.ready_poll_interval_ms,
            max_retries: admin.max_retries,
            retry_base_ms: admin.retry_base_ms,
            retry_max_ms: admin.retry_max_ms,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("admin_url", &self.admin_url)
            .field("admin_key", &"***")
            .field("route_prefix", &self.route_prefix)
            .finish_non_exhaustive()
    }
}

impl GatewayConfig {
    pub fn admin_client_config(&self) -> AdminClientConfig {
        AdminClientConfig {
            admin_url: self.admin_url.clone(),
            admin_key: self.admin_key.clone(),
            admin_key_header: self.admin_key_header.clone(),
            routes_path: self.routes_path.clone(),
            request_timeout_ms: self.request_timeout_ms,
            max_retries: self.max_retries,
            retry_base_ms: self.retry_base_ms,
            retry_max_ms: self.retry_max_ms,
        }
    }
}

/// `provisioning` section: engine concurrency, deadline and verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    pub max_concurrent_upserts: usize,
    pub max_concurrent_providers: usize,
    pub run_deadline_ms: u64,
    pub verify_attempts: u32,
    pub verify_interval_ms: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            max_concurrent_upserts: engine.max_concurrent_upserts,
            max_concurrent_providers: engine.max_concurrent_providers,
            run_deadline_ms: engine.run_deadline_ms,
            verify_attempts: engine.verify_attempts,
            verify_interval_ms: engine.verify_interval_ms,
        }
    }
}

impl RouteplaneConfig {
    pub fn engine_settings(&self, dry_run: bool) -> EngineSettings {
        EngineSettings {
            route_prefix: self.gateway.route_prefix.clone(),
            ready_timeout_ms: self.gateway.ready_timeout_ms,
            ready_poll_interval_ms: self.gateway.ready_poll_interval_ms,
            max_concurrent_upserts: self.provisioning.max_concurrent_upserts,
            max_concurrent_providers: self.provisioning.max_concurrent_providers,
            run_deadline_ms: self.provisioning.run_deadline_ms,
            verify_attempts: self.provisioning.verify_attempts,
            verify_interval_ms: self.provisioning.verify_interval_ms,
            dry_run,
        }
    }

    /// Keep only the entry whose id is `provider_id`.
    ///
    /// Returns `false` (and leaves the list untouched) when no entry matches.
    pub fn scope_to(&mut self, provider_id: &str) -> bool {
        if !self.providers.iter().any(|p| p.id == provider_id) {
            return false;
        }
        self.providers.retain(|p| p.id == provider_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_settings_follow_sections() {
        let mut config = RouteplaneConfig::default();
        config.gateway.route_prefix = "edge".into();
        config.provisioning.max_concurrent_upserts = 2;

        let settings = config.engine_settings(true);
        assert_eq!(settings.route_prefix, "edge");
        assert_eq!(settings.max_concurrent_upserts, 2);
        assert!(settings.dry_run);
        assert_eq!(settings.run_deadline_ms, EngineSettings::default().run_deadline_ms);
    }

    #[test]
    fn test_scope_to_known_and_unknown_provider() {
        let mut config = RouteplaneConfig {
            providers: vec![
                RawProviderConfig::new("a", "https://a.test"),
                RawProviderConfig::new("b", "https://b.test"),
            ],
            ..Default::default()
        };
        assert!(!config.scope_to("c"));
        assert_eq!(config.providers.len(), 2);
        assert!(config.scope_to("b"));
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].id, "b");
    }

    #[test]
    fn test_gateway_debug_redacts_admin_key() {
        let gateway = GatewayConfig {
            admin_key: "edd1c9f0".into(),
            ..Default::default()
        };
        assert!(!format!("{gateway:?}").contains("edd1c9f0"));
        assert_eq!(gateway.admin_client_config().admin_key, "edd1c9f0");
    }
}
