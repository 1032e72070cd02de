//! Provider registry: validation of raw configuration entries.
//!
//! [`load`] is pure.  It never touches the network and never fails as a
//! whole: every entry is either accepted, rejected with a [`ConfigError`], or
//! skipped because it is disabled.  The caller decides whether to proceed with
//! the accepted subset.

use crate::error::ConfigError;
use crate::provider::{
    AuthType, DEFAULT_SPEC_PATH, ProviderAuth, ProviderConfig, RawProviderConfig,
};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Longest accepted provider id.  Keeps derived route ids within the 64
/// characters most gateway admin APIs allow.
pub const MAX_PROVIDER_ID_LEN: usize = 40;

/// A rejected entry together with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Zero-based index of the entry in the configuration list.
    pub index: usize,
    /// The entry's id, or `#<index>` when the id is empty.
    pub label: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: ConfigError,
}

fn serialize_display<S: serde::Serializer>(err: &ConfigError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Outcome of [`load`].
#[derive(Debug, Clone, Default)]
pub struct RegistryLoad {
    /// Entries that passed validation, in input order.
    pub accepted: Vec<ProviderConfig>,
    /// Entries that failed validation, in input order.
    pub rejected: Vec<Rejection>,
    /// Ids of entries with `enabled: false`.  Not validated.
    pub disabled: Vec<String>,
}

impl RegistryLoad {
    /// Look up an accepted provider by id.
    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        self.accepted.iter().find(|p| p.id == id)
    }
}

/// Validate every raw entry.
///
/// Checks performed per enabled entry (first failure wins):
/// 1. `id` is non-empty, URL-safe and at most [`MAX_PROVIDER_ID_LEN`] chars.
/// 2. `id` is not already used by an earlier enabled entry, accepted or not.
/// 3. `base_url` is an absolute http(s) URL without credentials, query or fragment.
/// 4. `spec_path` (default `/openapi.json`) starts with `/` and has no whitespace.
/// 5. `auth_type` is one of `none`, `bearer`, `api_key`, `basic`.
/// 6. The credentials for that `auth_type` are present and non-empty, and no
///    credential belonging to another type is set.
pub fn load(raw: &[RawProviderConfig]) -> RegistryLoad {
    let mut out = RegistryLoad::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, entry) in raw.iter().enumerate() {
        let id = entry.id.trim();
        if !entry.enabled {
            debug!(provider = %id, "provider disabled, skipping validation");
            out.disabled.push(label_for(id, index));
            continue;
        }

        let outcome = validate_entry(entry, &seen);
        if !id.is_empty() {
            seen.insert(entry.id.clone());
        }
        match outcome {
            Ok(provider) => out.accepted.push(provider),
            Err(error) => {
                debug!(provider = %id, %error, "provider rejected");
                out.rejected.push(Rejection {
                    index,
                    label: label_for(id, index),
                    error,
                });
            }
        }
    }

    out
}

fn label_for(id: &str, index: usize) -> String {
    if id.is_empty() {
        format!("#{index}")
    } else {
        id.to_string()
    }
}

fn validate_entry(
    entry: &RawProviderConfig,
    seen: &HashSet<String>,
) -> Result<ProviderConfig, ConfigError> {
    // ── 1 + 2. Identity ──────────────────────────────────────────────────────
    let id = entry.id.as_str();
    if id.trim().is_empty() {
        return Err(ConfigError::EmptyProviderId);
    }
    if !is_valid_provider_id(id) {
        return Err(ConfigError::InvalidProviderId(id.to_string()));
    }
    if seen.contains(id) {
        return Err(ConfigError::DuplicateProviderId(id.to_string()));
    }

    // ── 3. Base URL ──────────────────────────────────────────────────────────
    let base_url = parse_base_url(id, &entry.base_url)?;

    // ── 4. Spec path ─────────────────────────────────────────────────────────
    let spec_path = entry
        .spec_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_SPEC_PATH);
    if !spec_path.starts_with('/') {
        return Err(ConfigError::InvalidSpecPath {
            provider: id.to_string(),
            reason: "must start with '/'".to_string(),
        });
    }
    if spec_path.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidSpecPath {
            provider: id.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    // ── 5 + 6. Auth ──────────────────────────────────────────────────────────
    let auth = parse_auth(id, entry)?;

    Ok(ProviderConfig {
        id: id.to_string(),
        base_url,
        spec_path: spec_path.to_string(),
        auth,
    })
}

/// `true` when `id` is 1..=40 ASCII alphanumerics/hyphens, not hyphen-bounded.
pub fn is_valid_provider_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_PROVIDER_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !id.starts_with('-')
        && !id.ends_with('-')
}

fn parse_base_url(id: &str, raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        provider: id.to_string(),
        reason: reason.to_string(),
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(invalid("base_url is required"));
    }
    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("host is required"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("embedded credentials are not allowed"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }
    Ok(url)
}

fn parse_auth(id: &str, entry: &RawProviderConfig) -> Result<ProviderAuth, ConfigError> {
    let declared = entry.auth_type.as_deref().unwrap_or("none");
    let auth_type = AuthType::parse(declared).ok_or_else(|| ConfigError::UnknownAuthType {
        provider: id.to_string(),
        value: declared.to_string(),
    })?;

    let fields: [(&'static str, &Option<String>, AuthType); 5] = [
        ("token", &entry.token, AuthType::Bearer),
        ("api_key", &entry.api_key, AuthType::ApiKey),
        ("header_name", &entry.header_name, AuthType::ApiKey),
        ("username", &entry.username, AuthType::Basic),
        ("password", &entry.password, AuthType::Basic),
    ];

    for &(field, value, owner) in &fields {
        if owner != auth_type && non_empty(value).is_some() {
            return Err(ConfigError::ConflictingCredential {
                provider: id.to_string(),
                auth_type: auth_type.to_string(),
                field,
            });
        }
    }

    let require = |field: &'static str, value: &Option<String>| {
        non_empty(value)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingCredential {
                provider: id.to_string(),
                auth_type: auth_type.to_string(),
                field,
            })
    };

    let auth = match auth_type {
        AuthType::None => ProviderAuth::None,
        AuthType::Bearer => ProviderAuth::Bearer {
            token: require("token", &entry.token)?,
        },
        AuthType::ApiKey => {
            let header_name = require("header_name", &entry.header_name)?;
            if !is_valid_header_name(&header_name) {
                return Err(ConfigError::InvalidHeaderName {
                    provider: id.to_string(),
                    header: header_name,
                });
            }
            ProviderAuth::ApiKey {
                header_name,
                key: require("api_key", &entry.api_key)?,
            }
        }
        AuthType::Basic => ProviderAuth::Basic {
            username: require("username", &entry.username)?,
            password: require("password", &entry.password)?,
        },
    };
    Ok(auth)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn is_valid_header_name(name: &str) -> bool {
    http::HeaderName::from_bytes(name.as_bytes()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(raw: RawProviderConfig) -> Result<ProviderConfig, ConfigError> {
        let mut loaded = load(&[raw]);
        if let Some(rejection) = loaded.rejected.pop() {
            return Err(rejection.error);
        }
        Ok(loaded.accepted.pop().unwrap())
    }

    #[test]
    fn accepts_minimal_provider_with_defaults() {
        let provider = single(RawProviderConfig::new("acme-1", "https://api.acme.test")).unwrap();
        assert_eq!(provider.id, "acme-1");
        assert_eq!(provider.spec_path, DEFAULT_SPEC_PATH);
        assert_eq!(provider.auth, ProviderAuth::None);
    }

    #[test]
    fn rejects_bad_ids() {
        assert_eq!(
            single(RawProviderConfig::new("  ", "https://a.test")),
            Err(ConfigError::EmptyProviderId)
        );
        let too_long = "a".repeat(41);
        for bad in ["acme_1", "acme 1", "-acme", "acme-", "ac/me", too_long.as_str()] {
            assert!(
                matches!(
                    single(RawProviderConfig::new(bad, "https://a.test")),
                    Err(ConfigError::InvalidProviderId(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_ids_with_surrounding_whitespace() {
        for padded in [" acme-1 ", "acme-1\t", "\nacme-1"] {
            assert_eq!(
                single(RawProviderConfig::new(padded, "https://a.test")),
                Err(ConfigError::InvalidProviderId(padded.to_string())),
                "{padded:?} should be rejected"
            );
        }
    }

    #[test]
    fn duplicate_of_rejected_entry_is_rejected() {
        let loaded = load(&[
            RawProviderConfig::new("acme-1", "ftp://a.test"),
            RawProviderConfig::new("acme-1", "https://a.test"),
        ]);

        assert!(loaded.accepted.is_empty());
        assert!(matches!(
            loaded.rejected[0].error,
            ConfigError::InvalidBaseUrl { .. }
        ));
        assert_eq!(
            loaded.rejected[1].error,
            ConfigError::DuplicateProviderId("acme-1".into())
        );
    }

    #[test]
    fn disabled_entry_does_not_reserve_its_id() {
        let loaded = load(&[
            RawProviderConfig::new("acme-1", "https://old.acme.test").enabled(false),
            RawProviderConfig::new("acme-1", "https://a.test"),
        ]);
        assert_eq!(loaded.accepted.len(), 1);
        assert_eq!(loaded.disabled, ["acme-1"]);
    }

    #[test]
    fn rejects_non_http_or_relative_base_urls() {
        for bad in [
            "",
            "api.acme.test",
            "/v1",
            "ftp://api.acme.test",
            "https://user:pw@api.acme.test",
            "https://api.acme.test/?x=1",
        ] {
            assert!(
                matches!(
                    single(RawProviderConfig::new("acme", bad)),
                    Err(ConfigError::InvalidBaseUrl { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_unknown_auth_type() {
        let mut raw = RawProviderConfig::new("acme", "https://a.test");
        raw.auth_type = Some("oauth2".into());
        assert!(matches!(
            single(raw),
            Err(ConfigError::UnknownAuthType { value, .. }) if value == "oauth2"
        ));
    }

    #[test]
    fn rejects_missing_credentials_for_every_auth_type() {
        let mut bearer = RawProviderConfig::new("a", "https://a.test").with_bearer("");
        bearer.token = Some("   ".into());
        assert!(matches!(
            single(bearer),
            Err(ConfigError::MissingCredential { field: "token", .. })
        ));

        let mut api_key = RawProviderConfig::new("a", "https://a.test").with_api_key("X-Key", "k");
        api_key.api_key = None;
        assert!(matches!(
            single(api_key),
            Err(ConfigError::MissingCredential { field: "api_key", .. })
        ));

        let mut no_header = RawProviderConfig::new("a", "https://a.test").with_api_key("X", "k");
        no_header.header_name = None;
        assert!(matches!(
            single(no_header),
            Err(ConfigError::MissingCredential {
                field: "header_name",
                ..
            })
        ));

        let mut basic = RawProviderConfig::new("a", "https://a.test").with_basic("u", "p");
        basic.password = None;
        assert!(matches!(
            single(basic),
            Err(ConfigError::MissingCredential {
                field: "password",
                ..
            })
        ));
    }

    #[test]
    fn rejects_credentials_of_another_auth_type() {
        let mut raw = RawProviderConfig::new("a", "https://a.test").with_bearer("t");
        raw.password = Some("p".into());
        assert!(matches!(
            single(raw),
            Err(ConfigError::ConflictingCredential {
                field: "password",
                ..
            })
        ));

        let mut none = RawProviderConfig::new("a", "https://a.test");
        none.token = Some("t".into());
        assert!(matches!(
            single(none),
            Err(ConfigError::ConflictingCredential { field: "token", .. })
        ));
    }

    #[test]
    fn rejects_invalid_api_key_header_name() {
        for bad in ["X Api Key", "X-Key:", "X-Key\u{e9}", "(X)", "X\"Key"] {
            let raw = RawProviderConfig::new("a", "https://a.test").with_api_key(bad, "k");
            assert!(
                matches!(single(raw), Err(ConfigError::InvalidHeaderName { .. })),
                "{bad:?} should be rejected"
            );
        }
        for good in ["X-Api-Key", "x_api_key", "Ocp-Apim-Subscription-Key", "X.Key~1"] {
            let raw = RawProviderConfig::new("a", "https://a.test").with_api_key(good, "k");
            assert!(single(raw).is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn rejects_bad_spec_path() {
        let raw = RawProviderConfig::new("a", "https://a.test").with_spec_path("openapi.json");
        assert!(matches!(
            single(raw),
            Err(ConfigError::InvalidSpecPath { .. })
        ));
    }

    #[test]
    fn collects_errors_and_keeps_valid_subset() {
        let loaded = load(&[
            RawProviderConfig::new("good", "https://a.test").with_bearer("t"),
            RawProviderConfig::new("", "https://a.test"),
            RawProviderConfig::new("good", "https://b.test"),
            RawProviderConfig::new("off", "not a url").enabled(false),
            RawProviderConfig::new("other", "https://c.test").with_basic("u", "p"),
        ]);

        let accepted: Vec<_> = loaded.accepted.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(accepted, ["good", "other"]);
        assert_eq!(loaded.disabled, ["off"]);
        assert_eq!(loaded.rejected.len(), 2);
        assert_eq!(loaded.rejected[0].label, "#1");
        assert_eq!(
            loaded.rejected[1].error,
            ConfigError::DuplicateProviderId("good".into())
        );
        assert!(loaded.get("other").is_some());
    }
}
