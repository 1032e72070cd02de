//! Command implementations

pub mod check;
pub mod provision;
pub mod routes;

use crate::config::{self, ConfigValidator, RouteplaneConfig};
use crate::error::CliError;
use colored::Colorize;
use std::path::Path;

/// Load the configuration file and refuse to continue on structural errors.
///
/// Warnings are printed to stderr.
pub(crate) fn load_validated(path: &Path) -> Result<RouteplaneConfig, CliError> {
    let config = config::load(path)?;
    let result = ConfigValidator::new().validate(&config);
    for warning in &result.warnings {
        eprintln!("{}", warning.to_string().yellow());
    }
    if !result.ok() {
        return Err(CliError::InvalidConfig(result.error_message()));
    }
    Ok(config)
}
