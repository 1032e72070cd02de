//! Provider configuration: the raw, user-supplied shape and the validated one.
//!
//! [`RawProviderConfig`] mirrors a configuration-file entry field for field and
//! accepts anything; [`registry::load`](crate::registry::load) turns it into a
//! [`ProviderConfig`] or a [`ConfigError`](crate::ConfigError).  Only validated
//! configs ever reach code that performs network I/O.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Description document location used when an entry omits `spec_path`.
pub const DEFAULT_SPEC_PATH: &str = "/openapi.json";

// ─────────────────────────────────────────────────────────────────────────────
// Raw entry
// ─────────────────────────────────────────────────────────────────────────────

/// A provider entry exactly as read from the configuration file.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawProviderConfig {
    pub id: String,
    pub enabled: bool,
    pub base_url: String,
    pub spec_path: Option<String>,
    /// One of `none`, `bearer`, `api_key`, `basic`.  Absent means `none`.
    pub auth_type: Option<String>,
    pub token: Option<String>,
    pub api_key: Option<String>,
    pub header_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for RawProviderConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            enabled: true,
            base_url: String::new(),
            spec_path: None,
            auth_type: None,
            token: None,
            api_key: None,
            header_name: None,
            username: None,
            password: None,
        }
    }
}

impl RawProviderConfig {
    /// Create an enabled entry without authentication.
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Builder: set `spec_path`.
    pub fn with_spec_path(mut self, path: impl Into<String>) -> Self {
        self.spec_path = Some(path.into());
        self
    }

    /// Builder: `auth_type: bearer` with the given token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.auth_type = Some("bearer".to_string());
        self.token = Some(token.into());
        self
    }

    /// Builder: `auth_type: api_key` sent in `header_name`.
    pub fn with_api_key(mut self, header_name: impl Into<String>, key: impl Into<String>) -> Self {
        self.auth_type = Some("api_key".to_string());
        self.header_name = Some(header_name.into());
        self.api_key = Some(key.into());
        self
    }

    /// Builder: `auth_type: basic`.
    pub fn with_basic(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth_type = Some("basic".to_string());
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Builder: toggle `enabled`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl fmt::Debug for RawProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawProviderConfig")
            .field("id", &self.id)
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("spec_path", &self.spec_path)
            .field("auth_type", &self.auth_type)
            .field("header_name", &self.header_name)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Recognised authentication schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    None,
    Bearer,
    ApiKey,
    Basic,
}

impl AuthType {
    /// Parse the configuration-file spelling.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(AuthType::None),
            "bearer" => Some(AuthType::Bearer),
            "api_key" => Some(AuthType::ApiKey),
            "basic" => Some(AuthType::Basic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::None => "none",
            AuthType::Bearer => "bearer",
            AuthType::ApiKey => "api_key",
            AuthType::Basic => "basic",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated credentials.  Exactly one variant's payload is ever populated.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderAuth {
    None,
    Bearer { token: String },
    ApiKey { header_name: String, key: String },
    Basic { username: String, password: String },
}

impl ProviderAuth {
    pub fn auth_type(&self) -> AuthType {
        match self {
            ProviderAuth::None => AuthType::None,
            ProviderAuth::Bearer { .. } => AuthType::Bearer,
            ProviderAuth::ApiKey { .. } => AuthType::ApiKey,
            ProviderAuth::Basic { .. } => AuthType::Basic,
        }
    }

    /// Header to attach to upstream requests, if any.
    pub fn header(&self) -> Option<(String, String)> {
        match self {
            ProviderAuth::None => None,
            ProviderAuth::Bearer { token } => {
                Some(("Authorization".to_string(), format!("Bearer {token}")))
            }
            ProviderAuth::ApiKey { header_name, key } => Some((header_name.clone(), key.clone())),
            ProviderAuth::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                Some(("Authorization".to_string(), format!("Basic {encoded}")))
            }
        }
    }
}

impl fmt::Debug for ProviderAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderAuth::None => f.write_str("None"),
            ProviderAuth::Bearer { .. } => f.write_str("Bearer { token: *** }"),
            ProviderAuth::ApiKey { header_name, .. } => f
                .debug_struct("ApiKey")
                .field("header_name", header_name)
                .field("key", &"***")
                .finish(),
            ProviderAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validated provider
// ─────────────────────────────────────────────────────────────────────────────

/// A provider that passed registry validation.  Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// URL-safe identifier, unique within the run.
    pub id: String,
    /// Absolute http(s) base URL of the upstream API.
    pub base_url: Url,
    /// Path appended to `base_url` to fetch the description document.
    pub spec_path: String,
    pub auth: ProviderAuth,
}

impl ProviderConfig {
    pub fn auth_type(&self) -> AuthType {
        self.auth.auth_type()
    }

    /// Full URL of the description document.
    pub fn spec_url(&self) -> String {
        format!("{}{}", self.base_path_url(), self.spec_path)
    }

    /// `base_url` rendered without a trailing slash.
    pub fn base_path_url(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }

    /// Path component of `base_url` without trailing slash (`""` for the root).
    pub fn base_path(&self) -> &str {
        self.base_url.path().trim_end_matches('/')
    }
}
