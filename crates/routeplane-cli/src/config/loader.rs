//! Configuration file loading
//!
//! Supports YAML, TOML and JSON, detected from the file extension.  `${VAR}`
//! and `$VAR` references inside string values are replaced with environment
//! values after parsing, so secrets can stay out of the file and are never
//! read as document syntax.

use super::RouteplaneConfig;
use crate::error::CliError;
use config::{ConfigError, File, FileFormat, Source, Value, ValueKind};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)\b")
        .expect("variable reference pattern is valid")
});

/// Detect configuration format from file extension
pub fn detect_format(path: &Path) -> Result<FileFormat, CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            CliError::ConfigError(format!("{} has no file extension", path.display()))
        })?;

    match ext.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        other => Err(CliError::ConfigError(format!(
            "unsupported config format '.{other}' (use .yaml, .toml or .json)"
        ))),
    }
}

/// Substitute environment variables in a string
///
/// Unset variables are left as written; [`ConfigValidator`](super::ConfigValidator)
/// warns about credentials that still contain a placeholder.
pub fn substitute_env_vars(content: &str) -> String {
    VAR_REF
        .replace_all(content, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Parse configuration text in the given format.
pub fn from_str(content: &str, format: FileFormat) -> Result<RouteplaneConfig, CliError> {
    let parse_error =
        |e: ConfigError| CliError::ConfigError(format!("failed to parse configuration: {e}"));
    let mut table = File::from_str(content, format).collect().map_err(parse_error)?;
    table.values_mut().for_each(substitute_value);
    Value::new(None, ValueKind::Table(table))
        .try_deserialize::<RouteplaneConfig>()
        .map_err(parse_error)
}

fn substitute_value(value: &mut Value) {
    match &mut value.kind {
        ValueKind::String(s) => *s = substitute_env_vars(s),
        ValueKind::Table(table) => table.values_mut().for_each(substitute_value),
        ValueKind::Array(items) => items.iter_mut().for_each(substitute_value),
        _ => {}
    }
}

/// Read and parse the configuration file at `path`.
pub fn load(path: &Path) -> Result<RouteplaneConfig, CliError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::ConfigError(format!("failed to read {}: {e}", path.display()))
    })?;
    let config = from_str(&content, format)?;
    tracing::debug!(
        path = %path.display(),
        providers = config.providers.len(),
        "configuration loaded"
    );
    Ok(config)
}
