//! Route synthesis: validated operations → gateway route definitions.
//!
//! For provider `acme-1` with base URL `https://api.acme.test/api` under the
//! public prefix `gw`, the operation `GET /v1/models/{id}` becomes:
//!
//! | field | value |
//! |-------|-------|
//! | match pattern | `/gw/acme-1/v1/models/*` |
//! | rewrite | `^/gw/acme-1(/.*)$` → `/api$1` |
//! | upstream | `https://api.acme.test:443` |

use routeplane_kernel::{
    OperationDescriptor, ProviderConfig, RewriteRule, RouteDefinition, UpstreamTarget, route_id,
};
use std::collections::BTreeMap;

/// Public path segment every managed route lives under when none is configured.
pub const DEFAULT_ROUTE_PREFIX: &str = "gw";

/// Builds [`RouteDefinition`]s under a fixed public prefix.
#[derive(Debug, Clone)]
pub struct RouteSynthesizer {
    prefix: String,
}

impl Default for RouteSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE_PREFIX)
    }
}

impl RouteSynthesizer {
    /// `prefix` is a single path segment; surrounding slashes are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `/<prefix>/<provider-id>/`: every match pattern of the provider starts
    /// with this, and no other provider's does.
    pub fn provider_prefix(&self, provider_id: &str) -> String {
        format!("/{}/{}/", self.prefix, provider_id)
    }

    /// One route per operation, in operation order.
    pub fn synthesize(
        &self,
        provider: &ProviderConfig,
        operations: &[OperationDescriptor],
    ) -> Vec<RouteDefinition> {
        let rewrite_rule = RewriteRule {
            pattern: format!("^/{}/{}(/.*)$", self.prefix, provider.id),
            replacement: format!("{}$1", provider.base_path()),
        };
        let upstream_target = upstream_of(provider);
        let injected_headers: BTreeMap<String, String> =
            provider.auth.header().into_iter().collect();

        operations
            .iter()
            .map(|op| RouteDefinition {
                route_id: route_id(&provider.id, op.method, &op.path),
                provider_id: provider.id.clone(),
                operation_id: op.operation_id.clone(),
                method: op.method,
                upstream_path: op.path.clone(),
                match_pattern: format!("/{}/{}{}", self.prefix, provider.id, op.wildcard_path()),
                rewrite_rule: rewrite_rule.clone(),
                upstream_target: upstream_target.clone(),
                injected_headers: injected_headers.clone(),
            })
            .collect()
    }
}

fn upstream_of(provider: &ProviderConfig) -> UpstreamTarget {
    let url = &provider.base_url;
    let scheme = url.scheme().to_string();
    let port = url
        .port_or_known_default()
        .unwrap_or(if scheme == "http" { 80 } else { 443 });
    UpstreamTarget {
        host: url.host_str().unwrap_or_default().to_string(),
        scheme,
        port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;
    use crate::admin::wire::ApisixRoute;
    use routeplane_kernel::{HttpMethod, ProviderAuth};

    fn acme(base: &str, auth: ProviderAuth) -> ProviderConfig {
        ProviderConfig {
            id: "acme-1".into(),
            base_url: Url::parse(base).unwrap(),
            spec_path: "/openapi.json".into(),
            auth,
        }
    }

    #[test]
    fn test_two_operations_become_two_routes() {
        let provider = acme("https://api.acme.test", ProviderAuth::None);
        let ops = vec![
            OperationDescriptor::new("/v1/models", HttpMethod::Get, None),
            OperationDescriptor::new("/v1/chat", HttpMethod::Post, None),
        ];

        let routes = RouteSynthesizer::default().synthesize(&provider, &ops);

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].match_pattern, "/gw/acme-1/v1/models");
        assert_eq!(routes[0].method, HttpMethod::Get);
        assert_eq!(routes[1].match_pattern, "/gw/acme-1/v1/chat");
        assert_eq!(routes[1].method, HttpMethod::Post);
        assert_ne!(routes[0].route_id, routes[1].route_id);
        assert_eq!(
            routes[0].route_id,
            route_id("acme-1", HttpMethod::Get, "/v1/models")
        );
        assert!(routes.iter().all(|r| r.injected_headers.is_empty()));
        assert_eq!(routes[0].upstream_target.node(), "api.acme.test:443");
        assert_eq!(routes[0].upstream_target.scheme, "https");
    }

    #[test]
    fn test_parameters_become_wildcards_and_rewrite_restores_base_path() {
        let provider = acme("http://10.0.0.5:8080/api/", ProviderAuth::None);
        let ops = vec![OperationDescriptor::new(
            "/v1/models/{model_id}",
            HttpMethod::Get,
            None,
        )];

        let routes = RouteSynthesizer::new("/edge/").synthesize(&provider, &ops);
        let route = &routes[0];

        assert_eq!(route.match_pattern, "/edge/acme-1/v1/models/*");
        assert_eq!(route.upstream_path, "/v1/models/{model_id}");
        assert_eq!(route.rewrite_rule.pattern, "^/edge/acme-1(/.*)$");
        assert_eq!(route.rewrite_rule.replacement, "/api$1");
        assert_eq!(route.upstream_target.node(), "10.0.0.5:8080");
        assert_eq!(route.upstream_target.scheme, "http");
    }

    #[test]
    fn test_inner_parameter_is_pinned_to_one_segment_on_the_gateway() {
        let provider = acme("https://api.acme.test", ProviderAuth::None);
        let ops = vec![OperationDescriptor::new(
            "/v1/models/{id}/details",
            HttpMethod::Get,
            None,
        )];

        let routes = RouteSynthesizer::default().synthesize(&provider, &ops);
        assert_eq!(routes[0].match_pattern, "/gw/acme-1/v1/models/*/details");

        let body = ApisixRoute::from(&routes[0]);
        assert_eq!(body.uri, "/gw/acme-1/v1/models/*");
        let matcher = regex::Regex::new(&body.vars[0][2]).unwrap();
        assert!(matcher.is_match("/gw/acme-1/v1/models/gpt-4/details"));
        assert!(!matcher.is_match("/gw/acme-1/v1/models/gpt-4"));
        assert_eq!(body.to_definition(), Some(routes[0].clone()));
    }

    #[test]
    fn test_auth_headers_are_injected() {
        let ops = vec![OperationDescriptor::new("/x", HttpMethod::Get, None)];
        let synth = RouteSynthesizer::default();

        let bearer = synth.synthesize(
            &acme(
                "https://api.acme.test",
                ProviderAuth::Bearer {
                    token: "t0k".into(),
                },
            ),
            &ops,
        );
        assert_eq!(bearer[0].injected_headers["Authorization"], "Bearer t0k");

        let api_key = synth.synthesize(
            &acme(
                "https://api.acme.test",
                ProviderAuth::ApiKey {
                    header_name: "X-Api-Key".into(),
                    key: "k".into(),
                },
            ),
            &ops,
        );
        assert_eq!(api_key[0].injected_headers.len(), 1);
        assert_eq!(api_key[0].injected_headers["X-Api-Key"], "k");
    }

    #[test]
    fn test_provider_prefix_does_not_overlap_similar_ids() {
        let synth = RouteSynthesizer::default();
        assert_eq!(synth.provider_prefix("acme-1"), "/gw/acme-1/");
        assert!(!"/gw/acme-10/v1".starts_with(&synth.provider_prefix("acme-1")));
    }
}
