//! Operations declared by a provider's description document.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method of an operation, covering the verbs an OpenAPI path item may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "PUT" => Some(HttpMethod::Put),
            "POST" => Some(HttpMethod::Post),
            "DELETE" => Some(HttpMethod::Delete),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            "PATCH" => Some(HttpMethod::Patch),
            "TRACE" => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OperationDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// One `(path, method)` pair exposed by a provider.
///
/// `path` is the template as written in the description document, e.g.
/// `/v1/models/{model_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Path template, always starting with `/`.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// `operationId` from the document, or a slug derived from method and path.
    pub operation_id: String,
}

impl OperationDescriptor {
    /// Create a descriptor, deriving `operation_id` when none is given.
    pub fn new(
        path: impl Into<String>,
        method: HttpMethod,
        operation_id: Option<String>,
    ) -> Self {
        let path = path.into();
        let operation_id = operation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| derive_operation_id(method, &path));
        Self {
            path,
            method,
            operation_id,
        }
    }

    /// Path with every `{param}` segment replaced by `*`.
    ///
    /// Two operations with the same wildcard shape and method would map to
    /// the same public route, so this is the identity used for de-duplication.
    pub fn wildcard_path(&self) -> String {
        wildcard_template(&self.path)
    }

    /// `METHOD path`, used in logs and reports.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Replace every `{param}` in a path template by `*`.
///
/// Assumes the template has already been checked for balanced braces.
pub fn wildcard_template(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_param = false;
    for ch in path.chars() {
        match ch {
            '{' => {
                in_param = true;
                out.push('*');
            }
            '}' => in_param = false,
            _ if in_param => {}
            _ => out.push(ch),
        }
    }
    out
}

fn derive_operation_id(method: HttpMethod, path: &str) -> String {
    let slug: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    let mut collapsed = String::with_capacity(slug.len());
    for c in slug.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    if collapsed.is_empty() {
        format!("{}_root", method.as_str().to_ascii_lowercase())
    } else {
        format!("{}_{}", method.as_str().to_ascii_lowercase(), collapsed)
    }
}
