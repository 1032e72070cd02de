//! Description fetches against a TLS endpoint with a self-signed certificate.

use reqwest::Url;
use routeplane_kernel::{ProviderAuth, ProviderConfig, ProvisionError, SpecSource, TrustMode};
use routeplane_provisioner::spec::{FetchConfig, HttpSpecSource};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

const DOC: &str = r#"{"paths":{"/v1/models":{"get":{}}}}"#;

/// Self-signed endpoint serving [`DOC`]; counts accepted and answered connections.
struct TlsServer {
    base: String,
    cert_pem: String,
    accepted: Arc<AtomicUsize>,
    served: Arc<AtomicUsize>,
}

impl TlsServer {
    fn start() -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let rcgen::CertifiedKey { cert, signing_key } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_pem = cert.pem();
        let cert_der = CertificateDer::from(cert);
        let key_der = PrivateKeyDer::from(PrivatePkcs8KeyDer::from(signing_key.serialize_der()));
        let config = Arc::new(
            ServerConfig::builder()
                .with_no_client_auth()
                .with_single_cert(vec![cert_der], key_der)
                .unwrap(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let served = Arc::new(AtomicUsize::new(0));

        let (accepted_in, served_in) = (accepted.clone(), served.clone());
        thread::spawn(move || {
            for tcp in listener.incoming() {
                let Ok(tcp) = tcp else { continue };
                accepted_in.fetch_add(1, Ordering::SeqCst);
                let Ok(conn) = ServerConnection::new(config.clone()) else {
                    continue;
                };
                let mut stream = StreamOwned::new(conn, tcp);
                let mut buf = [0u8; 2048];
                // A client that rejects the certificate aborts the handshake here.
                if !matches!(stream.read(&mut buf), Ok(n) if n > 0) {
                    continue;
                }
                served_in.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{DOC}",
                    DOC.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
                stream.conn.send_close_notify();
                let _ = stream.flush();
            }
        });

        Self {
            base: format!("https://localhost:{port}"),
            cert_pem,
            accepted,
            served,
        }
    }

    fn provider(&self) -> ProviderConfig {
        ProviderConfig {
            id: "acme-1".into(),
            base_url: Url::parse(&self.base).unwrap(),
            spec_path: "/openapi.json".into(),
            auth: ProviderAuth::None,
        }
    }

    fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

fn fetch_config() -> FetchConfig {
    FetchConfig {
        timeout_ms: 5_000,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_certificate_failure_retries_once_with_relaxed_trust() {
    let server = TlsServer::start();
    let source = HttpSpecSource::new(fetch_config()).unwrap();

    let fetched = source.fetch(&server.provider()).await.unwrap();

    assert_eq!(fetched.trust, TrustMode::Relaxed);
    assert_eq!(fetched.body, DOC);
    assert_eq!(server.accepted(), 2, "one strict attempt, one relaxed retry");
    assert_eq!(server.served(), 1);
}

#[tokio::test]
async fn test_relaxed_retry_can_trust_a_ca_bundle() {
    let server = TlsServer::start();
    let mut bundle = tempfile::Builder::new().suffix(".pem").tempfile().unwrap();
    bundle.write_all(server.cert_pem.as_bytes()).unwrap();

    let source = HttpSpecSource::new(FetchConfig {
        fallback_ca_bundle: Some(bundle.path().to_path_buf()),
        ..fetch_config()
    })
    .unwrap();
    let fetched = source.fetch(&server.provider()).await.unwrap();

    assert_eq!(fetched.trust, TrustMode::Relaxed);
    assert_eq!(fetched.body, DOC);
    assert_eq!(server.accepted(), 2);
}

#[tokio::test]
async fn test_disabled_fallback_reports_fetch_error() {
    let server = TlsServer::start();
    let source = HttpSpecSource::new(FetchConfig {
        relaxed_tls_fallback: false,
        ..fetch_config()
    })
    .unwrap();

    let err = source.fetch(&server.provider()).await.unwrap_err();

    match err {
        ProvisionError::Fetch {
            status, message, ..
        } => {
            assert_eq!(status, None);
            assert!(
                message.to_ascii_lowercase().contains("certificate"),
                "unexpected message: {message}"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.accepted(), 1);
    assert_eq!(server.served(), 0);
}
