//! Description-document source: kernel contract.

use crate::error::ProvisionError;
use crate::provider::ProviderConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trust policy that was in effect when a document was retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustMode {
    /// Default certificate verification.
    Strict,
    /// Fallback after a TLS trust failure.  Always surfaced in the run report.
    Relaxed,
}

/// A raw description document and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSpec {
    pub url: String,
    pub body: String,
    pub content_type: Option<String>,
    pub trust: TrustMode,
}

/// Retrieves a provider's description document.
#[async_trait]
pub trait SpecSource: Send + Sync {
    /// Fetch `provider.spec_url()`.
    ///
    /// Any non-2xx response is a [`ProvisionError::Fetch`]; no partial
    /// document is ever returned.
    async fn fetch(&self, provider: &ProviderConfig) -> Result<FetchedSpec, ProvisionError>;
}
