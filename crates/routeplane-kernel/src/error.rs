//! Error types for `routeplane-kernel`.
//!
//! Three layers of failure are distinguished:
//!
//! - [`ConfigError`]: a provider entry was rejected by the registry.  Raised
//!   before any network I/O and never retried.
//! - [`ValidationError`]: a fetched description document is malformed or
//!   exposes no usable operations.  Terminal for the provider.
//! - [`ProvisionError`]: the full taxonomy seen by the provisioning engine,
//!   wrapping the two above plus fetch, gateway and timeout failures.

use crate::state::ProviderPhase;
use thiserror::Error;

/// A provider configuration entry failed registry validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    // ── Identity ────────────────────────────────────────────────────────────
    /// The provider `id` field is empty or whitespace-only.
    #[error("provider id cannot be empty")]
    EmptyProviderId,

    /// The provider id contains characters other than ASCII alphanumerics and
    /// hyphens, starts/ends with a hyphen, or is too long.
    #[error("provider id '{0}' must be 1-40 ASCII alphanumerics or '-' and must not start or end with '-'")]
    InvalidProviderId(String),

    /// Another enabled entry already uses this id.
    #[error("provider id '{0}' is declared more than once")]
    DuplicateProviderId(String),

    // ── Location ─────────────────────────────────────────────────────────────
    /// `base_url` is not an absolute http(s) URL.
    #[error("provider '{provider}' has an invalid base_url: {reason}")]
    InvalidBaseUrl { provider: String, reason: String },

    /// `spec_path` is not a usable absolute path.
    #[error("provider '{provider}' has an invalid spec_path: {reason}")]
    InvalidSpecPath { provider: String, reason: String },

    // ── Auth ─────────────────────────────────────────────────────────────────
    /// `auth_type` is not one of `none`, `bearer`, `api_key`, `basic`.
    #[error("provider '{provider}' has unknown auth_type '{value}'")]
    UnknownAuthType { provider: String, value: String },

    /// A credential field required by the declared `auth_type` is missing or empty.
    #[error("provider '{provider}' uses auth_type '{auth_type}' but '{field}' is missing")]
    MissingCredential {
        provider: String,
        auth_type: String,
        field: &'static str,
    },

    /// A credential field that belongs to a different `auth_type` is populated.
    #[error("provider '{provider}' uses auth_type '{auth_type}' but also sets '{field}'")]
    ConflictingCredential {
        provider: String,
        auth_type: String,
        field: &'static str,
    },

    /// The `header_name` of an `api_key` provider is not a valid HTTP header name.
    #[error("provider '{provider}' has an invalid header_name '{header}'")]
    InvalidHeaderName { provider: String, header: String },
}

/// A provider description document is malformed or unusable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// The document is neither valid JSON nor valid YAML.
    #[error("description document is not valid JSON or YAML: {0}")]
    Unparseable(String),

    /// The document root is not a mapping.
    #[error("description document root must be a mapping")]
    NotAMapping,

    /// The document has no `paths` mapping.
    #[error("description document has no 'paths' mapping")]
    MissingPaths,

    /// No path entry declares a recognised HTTP method.
    #[error("description document exposes no usable operations")]
    NoOperations,

    /// A path key does not begin with `/`.
    #[error("path '{0}' must start with '/'")]
    InvalidPath(String),

    /// A path template has an unmatched or nested `{` / `}`.
    #[error("path '{0}' has unbalanced parameter braces")]
    UnbalancedTemplate(String),

    /// A path template contains an empty `{}` parameter.
    #[error("path '{0}' has an empty parameter name")]
    EmptyParameter(String),

    /// The document body exceeds the configured size limit.
    #[error("description document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Full error taxonomy of a provisioning run.
///
/// Retry behaviour is a property of the variant: only
/// [`GatewayTransient`](Self::GatewayTransient) is retried with backoff.
/// [`Fetch`](Self::Fetch) gets a single relaxed-trust retry inside the
/// fetcher, everything else is terminal for its scope.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProvisionError {
    /// The provider entry was rejected before any network call.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport, TLS or HTTP failure while retrieving a description document.
    #[error("fetching '{url}' failed: {message}")]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The description document is malformed or empty.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Network-level failure talking to the gateway administrative API.
    #[error("gateway unreachable: {0}")]
    GatewayTransient(String),

    /// The gateway rejected a well-formed request.
    #[error("gateway rejected request with status {status}: {body}")]
    GatewaySemantic { status: u16, body: String },

    /// Readiness wait or run deadline exceeded.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The engine attempted an illegal state-machine transition.
    #[error("illegal provider state transition {from} -> {to}")]
    InvalidTransition { from: ProviderPhase, to: ProviderPhase },
}

impl ProvisionError {
    /// Whether the operation that produced this error may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProvisionError::GatewayTransient(_))
    }

    /// Raw HTTP status code attached to the error, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProvisionError::Fetch { status, .. } => *status,
            ProvisionError::GatewaySemantic { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stable short name of the error class, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::Config(_) => "ConfigError",
            ProvisionError::Fetch { .. } => "FetchError",
            ProvisionError::Validation(_) => "ValidationError",
            ProvisionError::GatewayTransient(_) => "GatewayTransientError",
            ProvisionError::GatewaySemantic { .. } => "GatewaySemanticError",
            ProvisionError::Timeout(_) => "TimeoutError",
            ProvisionError::InvalidTransition { .. } => "InvalidTransition",
        }
    }
}

/// Result alias used throughout the provisioning crates.
pub type ProvisionResult<T> = Result<T, ProvisionError>;
