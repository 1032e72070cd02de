//! HTTP client for the gateway administrative API.

use super::wire::{ApisixRoute, parse_route_list};
use crate::error::{SetupError, describe_error};
use crate::retry::{RetryConfig, retry_with_policy};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use routeplane_kernel::{GatewayAdmin, ProvisionError, ProvisionResult, RouteDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

/// Longest gateway response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Connection settings, the `gateway` section of the configuration file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminClientConfig {
    /// Base URL of the administrative API, e.g. `http://127.0.0.1:9180`.
    pub admin_url: String,
    pub admin_key: String,
    /// Header carrying `admin_key`.
    pub admin_key_header: String,
    /// Path of the routes collection below `admin_url`.
    pub routes_path: String,
    pub request_timeout_ms: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: usize,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
}

impl Default for AdminClientConfig {
    fn default() -> Self {
        Self {
            admin_url: "http://127.0.0.1:9180".to_string(),
            admin_key: String::new(),
            admin_key_header: "X-API-KEY".to_string(),
            routes_path: "/apisix/admin/routes".to_string(),
            request_timeout_ms: 10_000,
            max_retries: 3,
            retry_base_ms: 200,
            retry_max_ms: 2_000,
        }
    }
}

impl fmt::Debug for AdminClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminClientConfig")
            .field("admin_url", &self.admin_url)
            .field("admin_key", &"***")
            .field("admin_key_header", &self.admin_key_header)
            .field("routes_path", &self.routes_path)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_base_ms", &self.retry_base_ms)
            .field("retry_max_ms", &self.retry_max_ms)
            .finish()
    }
}

impl AdminClientConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::exponential(self.max_retries, self.retry_base_ms, self.retry_max_ms)
    }
}

/// [`GatewayAdmin`] over an APISIX-style REST API.
///
/// One instance is shared by every provider of a run; `reqwest::Client` pools
/// connections internally.
pub struct AdminApiClient {
    config: AdminClientConfig,
    routes_url: String,
    client: Client,
    retry: RetryConfig,
}

impl AdminApiClient {
    pub fn new(config: AdminClientConfig) -> Result<Self, SetupError> {
        if !Self::is_valid_admin_url(&config.admin_url) {
            return Err(SetupError::InvalidAdminUrl(config.admin_url.clone()));
        }

        let routes_path = config.routes_path.trim_matches('/');
        let routes_url = format!("{}/{}", config.admin_url.trim_end_matches('/'), routes_path);

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            retry: config.retry_config(),
            config,
            routes_url,
            client,
        })
    }

    /// Whether `value` is an absolute http(s) URL with a host.
    pub fn is_valid_admin_url(value: &str) -> bool {
        Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
    }

    pub fn config(&self) -> &AdminClientConfig {
        &self.config
    }

    /// Collection URL, e.g. `http://127.0.0.1:9180/apisix/admin/routes`.
    pub fn routes_url(&self) -> &str {
        &self.routes_url
    }

    fn route_url(&self, route_id: &str) -> String {
        format!("{}/{}", self.routes_url, route_id)
    }

    /// Issue one request; any response, whatever its status, is `Ok`.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&ApisixRoute>,
    ) -> ProvisionResult<(u16, String)> {
        let mut request = self
            .client
            .request(method, url)
            .header(self.config.admin_key_header.as_str(), &self.config.admin_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProvisionError::GatewayTransient(describe_error(&e)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProvisionError::GatewayTransient(describe_error(&e)))?;
        Ok((status, text))
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn semantic(status: u16, body: String) -> ProvisionError {
    let body = if body.chars().count() > MAX_ERROR_BODY {
        let mut cut: String = body.chars().take(MAX_ERROR_BODY).collect();
        cut.push_str("...");
        cut
    } else {
        body
    };
    ProvisionError::GatewaySemantic { status, body }
}

#[async_trait]
impl GatewayAdmin for AdminApiClient {
    #[instrument(skip(self), fields(url = %self.routes_url))]
    async fn wait_ready(&self, timeout: Duration, poll_interval: Duration) -> ProvisionResult<()> {
        let deadline = Instant::now() + timeout;
        let mut attempts = 0u32;
        let mut last_error = "no response".to_string();

        loop {
            attempts += 1;
            let listing = self.execute(Method::GET, &self.routes_url, None);
            match tokio::time::timeout_at(deadline, listing).await {
                Ok(Ok((status, _))) if is_success(status) => {
                    info!(attempts, "gateway admin API is ready");
                    return Ok(());
                }
                Ok(Ok((status, _))) => last_error = format!("status {status}"),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => break,
            }
            debug!(attempts, error = %last_error, "gateway not ready yet");

            tokio::time::sleep_until((Instant::now() + poll_interval).min(deadline)).await;
            if Instant::now() >= deadline {
                break;
            }
        }

        Err(ProvisionError::Timeout(format!(
            "gateway not ready after {attempts} attempt(s) in {}ms: {last_error}",
            timeout.as_millis()
        )))
    }

    #[instrument(skip(self, route), fields(route_id = %route.route_id, provider = %route.provider_id))]
    async fn upsert_route(&self, route: &RouteDefinition) -> ProvisionResult<()> {
        let body = ApisixRoute::from(route);
        let url = self.route_url(&route.route_id);
        let (body, url) = (&body, url.as_str());

        retry_with_policy(&self.retry, "upsert_route", ProvisionError::is_retryable, || {
            async move {
                let (status, text) = self.execute(Method::PUT, url, Some(body)).await?;
                if is_success(status) {
                    debug!(status, "route upserted");
                    Ok(())
                } else {
                    Err(semantic(status, text))
                }
            }
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_route(&self, route_id: &str) -> ProvisionResult<()> {
        let url = self.route_url(route_id);
        let url = url.as_str();

        retry_with_policy(&self.retry, "delete_route", ProvisionError::is_retryable, || {
            async move {
                let (status, text) = self.execute(Method::DELETE, url, None).await?;
                match status {
                    s if is_success(s) => Ok(()),
                    404 => {
                        debug!("route already absent");
                        Ok(())
                    }
                    s => Err(semantic(s, text)),
                }
            }
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_routes(&self, prefix: &str) -> ProvisionResult<Vec<RouteDefinition>> {
        let url = self.routes_url.as_str();

        let (status, text) =
            retry_with_policy(&self.retry, "list_routes", ProvisionError::is_retryable, || {
                async move { self.execute(Method::GET, url, None).await }
            })
            .await?;

        if status == 404 {
            return Ok(Vec::new());
        }
        if !is_success(status) {
            return Err(semantic(status, text));
        }

        let body: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            semantic(status, format!("listing is not valid JSON: {e}"))
        })?;
        let routes: Vec<RouteDefinition> = parse_route_list(&body)
            .into_iter()
            .filter(|r| r.match_pattern.starts_with(prefix))
            .collect();
        debug!(count = routes.len(), "listed managed routes");
        Ok(routes)
    }
}
