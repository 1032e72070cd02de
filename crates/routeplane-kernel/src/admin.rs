//! Gateway administrative API: kernel contract.
//!
//! The provisioning engine only ever talks to the gateway through
//! [`GatewayAdmin`].  The HTTP implementation lives in
//! `routeplane-provisioner`; tests substitute in-memory fakes.

use crate::error::ProvisionError;
use crate::route::RouteDefinition;
use async_trait::async_trait;
use std::time::Duration;

/// Control-plane operations the engine needs from the gateway.
///
/// Implementations must be safe to share between concurrently running
/// providers; the engine holds one instance for the whole run.
#[async_trait]
pub trait GatewayAdmin: Send + Sync {
    /// Poll the gateway until its listing endpoint answers successfully.
    ///
    /// Returns [`ProvisionError::Timeout`] when `timeout` elapses first.
    async fn wait_ready(&self, timeout: Duration, poll_interval: Duration)
    -> Result<(), ProvisionError>;

    /// Create or replace the route keyed by `route.route_id`.
    ///
    /// Transient network failures are retried internally up to the
    /// implementation's attempt cap; semantic rejections are returned as
    /// [`ProvisionError::GatewaySemantic`] without retry.
    async fn upsert_route(&self, route: &RouteDefinition) -> Result<(), ProvisionError>;

    /// Delete a route.  A route that is already absent counts as deleted.
    async fn delete_route(&self, route_id: &str) -> Result<(), ProvisionError>;

    /// List the routes whose match pattern starts with `prefix`.
    async fn list_routes(&self, prefix: &str) -> Result<Vec<RouteDefinition>, ProvisionError>;
}
