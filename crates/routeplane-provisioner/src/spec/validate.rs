//! Description-document validation.
//!
//! Accepts OpenAPI 3.x and Swagger 2.0 shaped documents in JSON or YAML.  Only
//! the `paths` mapping is inspected: every path item key that names an HTTP
//! verb becomes an [`OperationDescriptor`]; everything else (`parameters`,
//! `summary`, `servers`, `$ref`, `x-*` extensions) is ignored.

use routeplane_kernel::{HttpMethod, OperationDescriptor, ValidationError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Parse a document body as JSON, falling back to YAML.
///
/// YAML mappings with non-string keys (e.g. `200:` response codes) are kept,
/// with the key rendered as a string.
pub fn parse_document(body: &str) -> Result<Value, ValidationError> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            debug!(error = %json_err, "document is not JSON, trying YAML");
            let yaml: serde_yaml::Value = serde_yaml::from_str(body)
                .map_err(|e| ValidationError::Unparseable(e.to_string()))?;
            Ok(yaml_to_json(yaml))
        }
    }
}

/// Parse and validate a raw document body.
pub fn validate(body: &str) -> Result<Vec<OperationDescriptor>, ValidationError> {
    validate_document(&parse_document(body)?)
}

/// Extract the operation set from a parsed document.
///
/// Operations are keyed by `(wildcard path, method)`: `/users/{id}` and
/// `/users/{name}` map to the same public route, so the entry that comes later
/// in the document replaces the earlier one and a warning is logged.  Method
/// keys are case-insensitive, so `GET` and `get` collapse the same way.  The
/// result is ordered by that key.
pub fn validate_document(doc: &Value) -> Result<Vec<OperationDescriptor>, ValidationError> {
    let root = doc.as_object().ok_or(ValidationError::NotAMapping)?;
    let paths = root
        .get("paths")
        .and_then(Value::as_object)
        .ok_or(ValidationError::MissingPaths)?;

    let mut operations: BTreeMap<(String, HttpMethod), OperationDescriptor> = BTreeMap::new();

    for (path, item) in paths {
        if !path.starts_with('/') {
            return Err(ValidationError::InvalidPath(path.clone()));
        }
        check_template(path)?;

        let Some(item) = item.as_object() else {
            debug!(path = %path, "path item is not a mapping, skipping");
            continue;
        };

        for (key, operation) in item {
            let Some(method) = HttpMethod::from_str_ci(key) else {
                continue;
            };
            let operation_id = operation_id_of(operation);
            let descriptor = OperationDescriptor::new(path.clone(), method, operation_id);
            let identity = (descriptor.wildcard_path(), method);

            if let Some(previous) = operations.insert(identity, descriptor) {
                warn!(
                    replaced = %previous.label(),
                    by = %format!("{method} {path}"),
                    "duplicate operation collapsed"
                );
            }
        }
    }

    if operations.is_empty() {
        return Err(ValidationError::NoOperations);
    }
    Ok(operations.into_values().collect())
}

fn operation_id_of(operation: &Value) -> Option<String> {
    operation
        .as_object()
        .and_then(|op| op.get("operationId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Reject unmatched, nested and empty `{param}` segments.
fn check_template(path: &str) -> Result<(), ValidationError> {
    let mut open = false;
    let mut param_len = 0usize;
    for ch in path.chars() {
        match ch {
            '{' => {
                if open {
                    return Err(ValidationError::UnbalancedTemplate(path.to_string()));
                }
                open = true;
                param_len = 0;
            }
            '}' => {
                if !open {
                    return Err(ValidationError::UnbalancedTemplate(path.to_string()));
                }
                if param_len == 0 {
                    return Err(ValidationError::EmptyParameter(path.to_string()));
                }
                open = false;
            }
            _ if open => param_len += 1,
            _ => {}
        }
    }
    if open {
        return Err(ValidationError::UnbalancedTemplate(path.to_string()));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// YAML → JSON
// ─────────────────────────────────────────────────────────────────────────────

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (k, v) in mapping {
                map.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(s) => s,
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
