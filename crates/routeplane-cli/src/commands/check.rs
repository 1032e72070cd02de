//! `routeplane check`: configuration file and registry validation, offline.

use crate::config::{self, ConfigValidator};
use crate::error::{CliError, EXIT_CONFIG};
use crate::output::{OutputFormat, Table, print_json};
use colored::Colorize;
use comfy_table::{Cell, Color};
use routeplane_kernel::registry::{self, RegistryLoad};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
struct CheckReport {
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    accepted: Vec<AcceptedProvider>,
    rejected: Vec<RejectedProvider>,
    disabled: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AcceptedProvider {
    id: String,
    spec_url: String,
    auth_type: String,
}

#[derive(Debug, Serialize)]
struct RejectedProvider {
    index: usize,
    label: String,
    error: String,
}

impl CheckReport {
    fn ok(&self) -> bool {
        self.valid && self.rejected.is_empty()
    }
}

pub fn run(config_path: &Path, format: OutputFormat) -> Result<ExitCode, CliError> {
    let config = config::load(config_path)?;
    let validation = ConfigValidator::new().validate(&config);
    let load = registry::load(&config.providers);
    let report = build_report(
        validation.ok(),
        validation.errors.iter().map(ToString::to_string).collect(),
        validation.warnings.iter().map(ToString::to_string).collect(),
        &load,
    );

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    if report.ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_CONFIG))
    }
}

fn build_report(
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    load: &RegistryLoad,
) -> CheckReport {
    CheckReport {
        valid,
        errors,
        warnings,
        accepted: load
            .accepted
            .iter()
            .map(|p| AcceptedProvider {
                id: p.id.clone(),
                spec_url: p.spec_url(),
                auth_type: p.auth_type().as_str().to_string(),
            })
            .collect(),
        rejected: load
            .rejected
            .iter()
            .map(|r| RejectedProvider {
                index: r.index,
                label: r.label.clone(),
                error: r.error.to_string(),
            })
            .collect(),
        disabled: load.disabled.clone(),
    }
}

fn print_report(report: &CheckReport) {
    for error in &report.errors {
        println!("{}", error.red());
    }
    for warning in &report.warnings {
        println!("{}", warning.yellow());
    }

    let mut builder = Table::builder().headers(&["PROVIDER", "STATUS", "DETAIL"]);
    for provider in &report.accepted {
        builder = builder.add_cells(vec![
            Cell::new(&provider.id),
            Cell::new("ok").fg(Color::Green),
            Cell::new(format!("{} (auth: {})", provider.spec_url, provider.auth_type)),
        ]);
    }
    for provider in &report.rejected {
        builder = builder.add_cells(vec![
            Cell::new(&provider.label),
            Cell::new("rejected").fg(Color::Red),
            Cell::new(format!("providers[{}]: {}", provider.index, provider.error)),
        ]);
    }
    for id in &report.disabled {
        builder = builder.add_cells(vec![
            Cell::new(id),
            Cell::new("disabled").fg(Color::DarkGrey),
            Cell::new(""),
        ]);
    }
    println!("{}", builder.build());

    if report.ok() {
        println!(
            "{} configuration is valid, {} provider(s) ready",
            "✓".green(),
            report.accepted.len()
        );
    } else {
        println!(
            "{} {} file error(s), {} rejected provider(s)",
            "✗".red(),
            report.errors.len(),
            report.rejected.len()
        );
    }
}
