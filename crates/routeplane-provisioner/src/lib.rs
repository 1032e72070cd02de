//! `routeplane-provisioner` - provisioning runtime.
//!
//! Concrete implementations of the `routeplane-kernel` contracts plus the
//! engine that drives them:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`SpecSource`](routeplane_kernel::SpecSource) | [`spec::HttpSpecSource`] |
//! | [`GatewayAdmin`](routeplane_kernel::GatewayAdmin) | [`admin::AdminApiClient`] |
//!
//! Pipeline per provider: registry → [`spec::fetch`] → [`spec::validate`] →
//! [`synth::RouteSynthesizer`] → gateway upserts, sequenced by
//! [`engine::Provisioner`], which also owns rollback and the run report.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use routeplane_kernel::RawProviderConfig;
//! use routeplane_provisioner::admin::{AdminApiClient, AdminClientConfig};
//! use routeplane_provisioner::engine::{EngineSettings, Provisioner};
//! use routeplane_provisioner::spec::{FetchConfig, HttpSpecSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = AdminApiClient::new(AdminClientConfig {
//!         admin_url: "http://127.0.0.1:9180".into(),
//!         admin_key: std::env::var("GATEWAY_ADMIN_KEY")?,
//!         ..Default::default()
//!     })?;
//!     let source = HttpSpecSource::new(FetchConfig::default())?;
//!     let provisioner = Provisioner::new(
//!         Arc::new(gateway),
//!         Arc::new(source),
//!         EngineSettings::default(),
//!     );
//!
//!     let report = provisioner
//!         .run(&[RawProviderConfig::new("acme-1", "https://api.acme.test")])
//!         .await;
//!     println!("run succeeded: {}", report.succeeded());
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod engine;
pub mod error;
pub mod retry;
pub mod spec;
pub mod synth;

pub use error::SetupError;
