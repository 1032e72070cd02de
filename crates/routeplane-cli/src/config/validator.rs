//! Configuration validation
//!
//! File-level checks only.  Individual provider entries are validated by the
//! registry at run time and reported per provider, so a bad entry never
//! blocks the others.

use super::RouteplaneConfig;
use routeplane_provisioner::admin::AdminApiClient;
use routeplane_provisioner::spec::FetchConfig;
use std::collections::HashSet;

/// Configuration validation result
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ConfigValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ConfigValidationResult {
    /// Check if validation passed
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Get formatted error message
    pub fn error_message(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Field path
    pub field: String,
    pub message: String,
    /// Suggestion for fixing
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "✗ {}. {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

/// Validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "⚠ {}. {}", self.field, self.message)
    }
}

/// Configuration validator
#[derive(Debug, Clone, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration
    pub fn validate(&self, config: &RouteplaneConfig) -> ConfigValidationResult {
        let mut result = ConfigValidationResult::default();
        self.validate_gateway(config, &mut result);
        self.validate_fetch(&config.fetch, &mut result);
        self.validate_provisioning(config, &mut result);
        self.validate_providers(config, &mut result);
        result
    }

    fn validate_gateway(&self, config: &RouteplaneConfig, result: &mut ConfigValidationResult) {
        let gateway = &config.gateway;

        if !AdminApiClient::is_valid_admin_url(&gateway.admin_url) {
            result.add_error(
                ValidationError::new(
                    "gateway.admin_url",
                    format!("'{}' is not an absolute http(s) URL", gateway.admin_url),
                )
                .with_suggestion("e.g. http://127.0.0.1:9180"),
            );
        }

        if gateway.admin_key.trim().is_empty() {
            result.add_error(
                ValidationError::new("gateway.admin_key", "Admin key cannot be empty")
                    .with_suggestion("Reference an environment variable: ${GATEWAY_ADMIN_KEY}"),
            );
        } else if has_placeholder(&gateway.admin_key) {
            result.add_warning(ValidationWarning::new(
                "gateway.admin_key",
                "Still contains an unresolved ${...} placeholder",
            ));
        }

        if gateway.admin_key_header.trim().is_empty() {
            result.add_error(ValidationError::new(
                "gateway.admin_key_header",
                "Header name cannot be empty",
            ));
        }

        if !gateway.routes_path.starts_with('/') {
            result.add_error(
                ValidationError::new("gateway.routes_path", "Must start with '/'")
                    .with_suggestion("e.g. /apisix/admin/routes"),
            );
        }

        if !is_path_segment(&gateway.route_prefix) {
            result.add_error(
                ValidationError::new(
                    "gateway.route_prefix",
                    format!(
                        "'{}' must be a single path segment of letters, digits, '-' or '_'",
                        gateway.route_prefix
                    ),
                )
                .with_suggestion("e.g. gw"),
            );
        }

        for (field, value) in [
            ("gateway.request_timeout_ms", gateway.request_timeout_ms),
            ("gateway.ready_timeout_ms", gateway.ready_timeout_ms),
            ("gateway.ready_poll_interval_ms", gateway.ready_poll_interval_ms),
        ] {
            if value == 0 {
                result.add_error(
                    ValidationError::new(field, "Cannot be zero")
                        .with_suggestion("Set a positive value or remove to use default"),
                );
            }
        }

        if gateway.retry_base_ms > gateway.retry_max_ms {
            result.add_warning(ValidationWarning::new(
                "gateway.retry_base_ms",
                "Larger than retry_max_ms; every retry will wait retry_max_ms",
            ));
        }
    }

    fn validate_fetch(&self, fetch: &FetchConfig, result: &mut ConfigValidationResult) {
        if fetch.timeout_ms == 0 {
            result.add_error(
                ValidationError::new("fetch.timeout_ms", "Cannot be zero")
                    .with_suggestion("Set a positive value or remove to use default"),
            );
        }
        if fetch.max_spec_bytes == 0 {
            result.add_error(ValidationError::new(
                "fetch.max_spec_bytes",
                "Cannot be zero",
            ));
        }
        if let Some(path) = &fetch.fallback_ca_bundle {
            if !fetch.relaxed_tls_fallback {
                result.add_warning(ValidationWarning::new(
                    "fetch.fallback_ca_bundle",
                    "Ignored because relaxed_tls_fallback is false",
                ));
            } else if !path.exists() {
                result.add_error(ValidationError::new(
                    "fetch.fallback_ca_bundle",
                    format!("{} does not exist", path.display()),
                ));
            }
        }
    }

    fn validate_provisioning(&self, config: &RouteplaneConfig, result: &mut ConfigValidationResult) {
        let provisioning = &config.provisioning;
        for (field, value) in [
            (
                "provisioning.max_concurrent_upserts",
                provisioning.max_concurrent_upserts as u64,
            ),
            (
                "provisioning.max_concurrent_providers",
                provisioning.max_concurrent_providers as u64,
            ),
            ("provisioning.run_deadline_ms", provisioning.run_deadline_ms),
        ] {
            if value == 0 {
                result.add_error(
                    ValidationError::new(field, "Cannot be zero")
                        .with_suggestion("Set a positive value or remove to use default"),
                );
            }
        }

        if provisioning.run_deadline_ms > 0
            && provisioning.run_deadline_ms <= config.gateway.ready_timeout_ms
        {
            result.add_warning(ValidationWarning::new(
                "provisioning.run_deadline_ms",
                "Not longer than gateway.ready_timeout_ms; a slow gateway leaves no time to provision",
            ));
        }
    }

    fn validate_providers(&self, config: &RouteplaneConfig, result: &mut ConfigValidationResult) {
        if config.providers.is_empty() {
            result.add_warning(ValidationWarning::new("providers", "No providers configured"));
            return;
        }

        let mut seen = HashSet::new();
        for (index, provider) in config.providers.iter().enumerate() {
            let field = format!("providers[{index}]");
            if !provider.id.is_empty() && !seen.insert(provider.id.as_str()) {
                result.add_error(
                    ValidationError::new(
                        format!("{field}.id"),
                        format!("Duplicate provider id '{}'", provider.id),
                    )
                    .with_suggestion("Provider ids must be unique"),
                );
            }

            let credentials = [
                ("token", &provider.token),
                ("api_key", &provider.api_key),
                ("password", &provider.password),
            ];
            for (name, value) in credentials {
                if value.as_deref().is_some_and(has_placeholder) {
                    result.add_warning(ValidationWarning::new(
                        format!("{field}.{name}"),
                        "Still contains an unresolved ${...} placeholder",
                    ));
                }
            }
        }
    }
}

fn has_placeholder(value: &str) -> bool {
    value.contains("${")
}

fn is_path_segment(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
