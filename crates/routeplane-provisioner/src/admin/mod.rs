//! Gateway administrative API client.
//!
//! - [`client`]: [`AdminApiClient`], the retrying [`GatewayAdmin`](routeplane_kernel::GatewayAdmin)
//!   implementation.
//! - [`wire`]: route bodies as the gateway stores them.

pub mod client;
pub mod wire;

pub use client::{AdminApiClient, AdminClientConfig};
pub use wire::{ApisixRoute, MANAGED_BY, parse_route_list};
