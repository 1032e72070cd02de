//! HTTP(S) retrieval of provider description documents.
//!
//! [`HttpSpecSource`] performs one GET against `base_url + spec_path` with the
//! provider's credentials.  When the strict attempt fails certificate
//! verification and the fallback is enabled, it retries exactly once with a
//! relaxed client: either trusting only a configured CA bundle, or, with no
//! bundle, skipping verification.  A relaxed fetch is always flagged as
//! [`TrustMode::Relaxed`] and logged at `warn`.

use crate::error::{SetupError, describe_error};
use async_trait::async_trait;
use reqwest::{Certificate, Client, Response};
use routeplane_kernel::{
    FetchedSpec, ProviderConfig, ProvisionError, SpecSource, TrustMode, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Fetcher settings, the `fetch` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Documents larger than this are rejected.
    pub max_spec_bytes: usize,
    /// Retry once with relaxed trust after a certificate failure.
    pub relaxed_tls_fallback: bool,
    /// PEM CA certificate trusted by the relaxed client instead of the
    /// built-in roots.  Without it the relaxed client skips verification.
    pub fallback_ca_bundle: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_spec_bytes: 10 * 1024 * 1024,
            relaxed_tls_fallback: true,
            fallback_ca_bundle: None,
            user_agent: concat!("routeplane/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// [`SpecSource`] backed by `reqwest`.
pub struct HttpSpecSource {
    config: FetchConfig,
    strict: Client,
    relaxed: Option<Client>,
}

impl HttpSpecSource {
    pub fn new(config: FetchConfig) -> Result<Self, SetupError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let strict = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        let relaxed = if config.relaxed_tls_fallback {
            let builder = Client::builder()
                .timeout(timeout)
                .user_agent(config.user_agent.clone());
            let builder = match &config.fallback_ca_bundle {
                Some(path) => {
                    let pem = std::fs::read(path).map_err(|source| SetupError::CaBundle {
                        path: path.clone(),
                        source,
                    })?;
                    builder
                        .tls_built_in_root_certs(false)
                        .add_root_certificate(Certificate::from_pem(&pem)?)
                }
                None => builder.danger_accept_invalid_certs(true),
            };
            Some(builder.build()?)
        } else {
            None
        };

        Ok(Self {
            config,
            strict,
            relaxed,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn get(
        &self,
        client: &Client,
        provider: &ProviderConfig,
        url: &str,
    ) -> Result<Response, reqwest::Error> {
        let mut request = client
            .get(url)
            .header("accept", "application/json, application/yaml;q=0.9, */*;q=0.5");
        if let Some((name, value)) = provider.auth.header() {
            request = request.header(name, value);
        }
        request.send().await
    }

    async fn read(
        &self,
        mut response: Response,
        url: &str,
        trust: TrustMode,
    ) -> Result<FetchedSpec, ProvisionError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::Fetch {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: format!("upstream answered {status}"),
            });
        }

        let limit = self.config.max_spec_bytes;
        if let Some(length) = response.content_length() {
            let size = usize::try_from(length).unwrap_or(usize::MAX);
            if size > limit {
                return Err(ValidationError::TooLarge { size, limit }.into());
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Content-Length is absent on chunked responses, so the cap is also
        // enforced while streaming.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| fetch_error(url, &e))? {
            let size = bytes.len() + chunk.len();
            if size > limit {
                return Err(ValidationError::TooLarge { size, limit }.into());
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8(bytes).map_err(|_| {
            ValidationError::Unparseable("document is not valid UTF-8".to_string())
        })?;

        debug!(url, bytes = body.len(), trust = ?trust, "description document fetched");
        Ok(FetchedSpec {
            url: url.to_string(),
            body,
            content_type,
            trust,
        })
    }
}

#[async_trait]
impl SpecSource for HttpSpecSource {
    #[instrument(skip(self, provider), fields(provider = %provider.id))]
    async fn fetch(&self, provider: &ProviderConfig) -> Result<FetchedSpec, ProvisionError> {
        let url = provider.spec_url();
        match self.get(&self.strict, provider, &url).await {
            Ok(response) => self.read(response, &url, TrustMode::Strict).await,
            Err(err) if is_tls_failure(&err) => {
                let Some(relaxed) = &self.relaxed else {
                    return Err(fetch_error(&url, &err));
                };
                warn!(
                    url = %url,
                    error = %describe_error(&err),
                    "certificate verification failed, retrying with relaxed trust"
                );
                let response = self
                    .get(relaxed, provider, &url)
                    .await
                    .map_err(|e| fetch_error(&url, &e))?;
                self.read(response, &url, TrustMode::Relaxed).await
            }
            Err(err) => Err(fetch_error(&url, &err)),
        }
    }
}

fn fetch_error(url: &str, err: &reqwest::Error) -> ProvisionError {
    ProvisionError::Fetch {
        url: url.to_string(),
        status: err.status().map(|s| s.as_u16()),
        message: describe_error(err),
    }
}

/// Whether a transport error was caused by certificate or handshake failure.
fn is_tls_failure(err: &reqwest::Error) -> bool {
    if !err.is_connect() {
        return false;
    }
    const MARKERS: [&str; 5] = ["certificate", "tls", "ssl", "handshake", "unknownissuer"];
    let text = describe_error(err).to_ascii_lowercase();
    MARKERS.iter().any(|m| text.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;
    use routeplane_kernel::ProviderAuth;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base: &str, auth: ProviderAuth) -> ProviderConfig {
        ProviderConfig {
            id: "acme-1".into(),
            base_url: Url::parse(base).unwrap(),
            spec_path: "/openapi.json".into(),
            auth,
        }
    }

    const DOC: &str = r#"{"paths":{"/v1/models":{"get":{}}}}"#;

    #[tokio::test]
    async fn test_fetch_sends_provider_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openapi.json"))
            .and(header("authorization", "Bearer t0k"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(DOC, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpSpecSource::new(FetchConfig::default()).unwrap();
        let fetched = source
            .fetch(&provider(
                &server.uri(),
                ProviderAuth::Bearer {
                    token: "t0k".into(),
                },
            ))
            .await
            .unwrap();

        assert_eq!(fetched.body, DOC);
        assert_eq!(fetched.trust, TrustMode::Strict);
        assert_eq!(fetched.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpSpecSource::new(FetchConfig::default()).unwrap();
        let err = source
            .fetch(&provider(&server.uri(), ProviderAuth::None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::Fetch {
                status: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_oversized_document_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DOC))
            .mount(&server)
            .await;

        let source = HttpSpecSource::new(FetchConfig {
            max_spec_bytes: 8,
            ..Default::default()
        })
        .unwrap();
        let err = source
            .fetch(&provider(&server.uri(), ProviderAuth::None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::Validation(ValidationError::TooLarge { limit: 8, .. })
        ));
    }

    /// Serve one `Transfer-Encoding: chunked` response, without a length header.
    async fn serve_chunked(chunks: Vec<String>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let mut response = String::from(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                 transfer-encoding: chunked\r\nconnection: close\r\n\r\n",
            );
            for chunk in chunks {
                response.push_str(&format!("{:x}\r\n{chunk}\r\n", chunk.len()));
            }
            response.push_str("0\r\n\r\n");
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_oversized_chunked_document_is_rejected_while_streaming() {
        let base = serve_chunked(vec!["x".repeat(32); 16]).await;
        let source = HttpSpecSource::new(FetchConfig {
            max_spec_bytes: 64,
            ..Default::default()
        })
        .unwrap();

        let err = source
            .fetch(&provider(&base, ProviderAuth::None))
            .await
            .unwrap_err();

        match err {
            ProvisionError::Validation(ValidationError::TooLarge { size, limit }) => {
                assert_eq!(limit, 64);
                assert!(size > 64 && size < 16 * 32, "stopped at {size} bytes");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chunked_document_within_limit_is_read() {
        let (head, tail) = DOC.split_at(10);
        let base = serve_chunked(vec![head.to_string(), tail.to_string()]).await;
        let source = HttpSpecSource::new(FetchConfig {
            max_spec_bytes: DOC.len(),
            ..Default::default()
        })
        .unwrap();

        let fetched = source
            .fetch(&provider(&base, ProviderAuth::None))
            .await
            .unwrap();
        assert_eq!(fetched.body, DOC);
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_a_tls_failure() {
        // Nothing listens on port 9 locally.
        let source = HttpSpecSource::new(FetchConfig {
            timeout_ms: 2_000,
            ..Default::default()
        })
        .unwrap();
        let err = source
            .fetch(&provider("http://127.0.0.1:9", ProviderAuth::None))
            .await
            .unwrap_err();

        match err {
            ProvisionError::Fetch { status, .. } => assert_eq!(status, None),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_ca_bundle_fails_setup() {
        let result = HttpSpecSource::new(FetchConfig {
            fallback_ca_bundle: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..Default::default()
        });
        assert!(matches!(result, Err(SetupError::CaBundle { .. })));
    }
}
