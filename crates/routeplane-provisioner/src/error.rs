//! Errors raised while constructing runtime components.
//!
//! Per-provider and per-route failures use
//! [`ProvisionError`](routeplane_kernel::ProvisionError); this type only covers
//! setup that happens before a run starts.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to read CA bundle {path}: {source}")]
    CaBundle {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid admin URL '{0}'")]
    InvalidAdminUrl(String),
}

/// Render an error and its `source()` chain as `outer: inner: root`.
///
/// `reqwest::Error`'s `Display` omits the underlying connect/TLS cause, which
/// is the part operators need.
pub(crate) fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
