//! `routeplane-kernel` - provider model and provisioning contract.
//!
//! This crate defines the *data model, validation rules and trait interfaces*
//! used to provision gateway routes for upstream API providers.  It performs
//! no network I/O; concrete implementations live in `routeplane-provisioner`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              routeplane-kernel  (this crate)                │
//! │  RawProviderConfig → registry::load → ProviderConfig        │
//! │  OperationDescriptor   RouteDefinition + route_id()         │
//! │  ProviderPhase / ProvisioningState   ProvisionError         │
//! │  GatewayAdmin trait    SpecSource trait                     │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              routeplane-provisioner  (runtime crate)        │
//! │  HttpSpecSource: impl SpecSource                            │
//! │  AdminApiClient: impl GatewayAdmin                          │
//! │  spec validator, route synthesizer, Provisioner engine      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use routeplane_kernel::{registry, RawProviderConfig};
//!
//! let raw = RawProviderConfig::new("acme-1", "https://api.acme.test")
//!     .with_bearer("secret-token");
//! let loaded = registry::load(&[raw]);
//! assert_eq!(loaded.accepted.len(), 1);
//! assert!(loaded.rejected.is_empty());
//! ```

pub mod admin;
pub mod error;
pub mod operation;
pub mod provider;
pub mod registry;
pub mod route;
pub mod source;
pub mod state;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use admin::GatewayAdmin;
pub use error::{ConfigError, ProvisionError, ProvisionResult, ValidationError};
pub use operation::{HttpMethod, OperationDescriptor};
pub use provider::{AuthType, ProviderAuth, ProviderConfig, RawProviderConfig};
pub use registry::{Rejection, RegistryLoad};
pub use route::{RewriteRule, RouteDefinition, UpstreamTarget, route_id};
pub use source::{FetchedSpec, SpecSource, TrustMode};
pub use state::{ProviderPhase, ProvisioningState, RouteFailure};
