//! Route bodies as exchanged with an APISIX-style administrative API.

use routeplane_kernel::operation::wildcard_template;
use routeplane_kernel::{HttpMethod, RewriteRule, RouteDefinition, UpstreamTarget};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Value of the `managed-by` label on every route this tool writes.
pub const MANAGED_BY: &str = "routeplane";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApisixRoute {
    pub id: String,
    pub name: String,
    /// Upstream path template the route was synthesized from.
    #[serde(default)]
    pub desc: String,
    /// Gateway `uri` matcher. `*` is only honoured as a trailing prefix
    /// wildcard, so patterns with an inner wildcard are cut at it.
    pub uri: String,
    /// Extra match conditions, `[variable, operator, value]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<[String; 3]>,
    pub methods: Vec<HttpMethod>,
    pub upstream: ApisixUpstream,
    #[serde(default)]
    pub plugins: ApisixPlugins,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApisixUpstream {
    #[serde(rename = "type")]
    pub kind: String,
    pub scheme: String,
    #[serde(default)]
    pub pass_host: String,
    /// `host:port` → weight.
    pub nodes: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApisixPlugins {
    #[serde(
        rename = "proxy-rewrite",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub proxy_rewrite: Option<ProxyRewrite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRewrite {
    /// `[pattern, replacement]`.
    pub regex_uri: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderRewrite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRewrite {
    pub set: BTreeMap<String, String>,
}

impl From<&RouteDefinition> for ApisixRoute {
    fn from(route: &RouteDefinition) -> Self {
        let headers = (!route.injected_headers.is_empty()).then(|| HeaderRewrite {
            set: route.injected_headers.clone(),
        });
        let (uri, vars) = uri_matcher(&route.match_pattern);
        Self {
            id: route.route_id.clone(),
            name: route.operation_id.clone(),
            desc: route.upstream_path.clone(),
            uri,
            vars,
            methods: vec![route.method],
            upstream: ApisixUpstream {
                kind: "roundrobin".to_string(),
                scheme: route.upstream_target.scheme.clone(),
                pass_host: "node".to_string(),
                nodes: BTreeMap::from([(route.upstream_target.node(), 1)]),
            },
            plugins: ApisixPlugins {
                proxy_rewrite: Some(ProxyRewrite {
                    regex_uri: vec![
                        route.rewrite_rule.pattern.clone(),
                        route.rewrite_rule.replacement.clone(),
                    ],
                    headers,
                }),
            },
            labels: BTreeMap::from([
                ("managed-by".to_string(), MANAGED_BY.to_string()),
                ("provider".to_string(), route.provider_id.clone()),
            ]),
        }
    }
}

impl ApisixRoute {
    pub fn is_managed(&self) -> bool {
        self.labels.get("managed-by").map(String::as_str) == Some(MANAGED_BY)
    }

    /// Map a listed body back into a [`RouteDefinition`].
    ///
    /// `None` for routes this tool did not write or whose shape it cannot
    /// interpret.
    pub fn to_definition(&self) -> Option<RouteDefinition> {
        if !self.is_managed() {
            return None;
        }
        let provider_id = self.labels.get("provider")?.clone();
        let method = *self.methods.first()?;
        let (node, _) = self.upstream.nodes.iter().next()?;
        let (host, port) = node.rsplit_once(':')?;
        let port = port.parse().ok()?;
        let rewrite = self.plugins.proxy_rewrite.as_ref()?;
        let [pattern, replacement] = rewrite.regex_uri.as_slice() else {
            return None;
        };
        let match_pattern = if self.vars.is_empty() {
            self.uri.clone()
        } else {
            let root = pattern.strip_prefix('^')?.strip_suffix("(/.*)$")?;
            format!("{root}{}", wildcard_template(&self.desc))
        };

        Some(RouteDefinition {
            route_id: self.id.clone(),
            provider_id,
            operation_id: self.name.clone(),
            method,
            upstream_path: self.desc.clone(),
            match_pattern,
            rewrite_rule: RewriteRule {
                pattern: pattern.clone(),
                replacement: replacement.clone(),
            },
            upstream_target: UpstreamTarget {
                scheme: self.upstream.scheme.clone(),
                host: host.to_string(),
                port,
            },
            injected_headers: rewrite
                .headers
                .as_ref()
                .map(|h| h.set.clone())
                .unwrap_or_default(),
        })
    }
}

/// Split a match pattern into the gateway `uri` and its `vars` conditions.
///
/// A pattern whose only wildcard is trailing is used as is.  Otherwise the
/// `uri` keeps everything up to the first wildcard as a prefix match and a
/// `uri ~~ regex` condition pins each wildcard to exactly one segment.
fn uri_matcher(pattern: &str) -> (String, Vec<[String; 3]>) {
    match pattern.split_once('*') {
        Some((head, tail)) if !tail.is_empty() => {
            let segments: Vec<String> = pattern.split('*').map(regex::escape).collect();
            let condition = [
                "uri".to_string(),
                "~~".to_string(),
                format!("^{}$", segments.join("[^/]+")),
            ];
            (format!("{head}*"), vec![condition])
        }
        _ => (pattern.to_string(), Vec::new()),
    }
}

/// Extract managed route definitions from a listing response.
///
/// Accepts the v3 `{"list":[{"value":…}]}` envelope, the v2
/// `{"node":{"nodes":[{"value":…}]}}` envelope and a bare array.
pub fn parse_route_list(body: &Value) -> Vec<RouteDefinition> {
    let items = body
        .get("list")
        .or_else(|| body.get("node").and_then(|n| n.get("nodes")))
        .unwrap_or(body)
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();

    items
        .iter()
        .filter_map(|item| {
            let value = item.get("value").unwrap_or(item);
            match serde_json::from_value::<ApisixRoute>(value.clone()) {
                Ok(route) => route.to_definition(),
                Err(e) => {
                    debug!(error = %e, "skipping unrecognised route entry");
                    None
                }
            }
        })
        .collect()
}
