//! `routeplane provision`

use super::load_validated;
use crate::error::{CliError, EXIT_FAILURE};
use crate::output::{OutputFormat, Table, phase_cell, print_json};
use colored::Colorize;
use comfy_table::{Cell, Color};
use routeplane_kernel::{ProviderPhase, TrustMode};
use routeplane_provisioner::admin::AdminApiClient;
use routeplane_provisioner::engine::{ProviderReport, Provisioner, RunReport};
use routeplane_provisioner::spec::HttpSpecSource;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Flags of the `provision` subcommand.
#[derive(Debug, Clone, Default)]
pub struct ProvisionArgs {
    pub dry_run: bool,
    pub provider: Option<String>,
    pub snapshot: Option<PathBuf>,
}

pub async fn run(
    config_path: &Path,
    args: ProvisionArgs,
    format: OutputFormat,
) -> Result<ExitCode, CliError> {
    let mut config = load_validated(config_path)?;
    if let Some(id) = &args.provider
        && !config.scope_to(id)
    {
        return Err(CliError::UnknownProvider(id.clone()));
    }

    let gateway = AdminApiClient::new(config.gateway.admin_client_config())?;
    let source = HttpSpecSource::new(config.fetch.clone())?;
    let provisioner = Provisioner::new(
        Arc::new(gateway),
        Arc::new(source),
        config.engine_settings(args.dry_run),
    );

    info!(
        providers = config.providers.len(),
        dry_run = args.dry_run,
        "starting provisioning run"
    );
    let report = provisioner.run(&config.providers).await;

    if let Some(path) = &args.snapshot {
        write_snapshot(path, &report)?;
    }

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    if report.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FAILURE))
    }
}

fn write_snapshot(path: &Path, report: &RunReport) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "run snapshot written");
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("{}", status_table(report));

    if report.dry_run {
        for provider in report.providers.iter().filter(|p| !p.planned_routes.is_empty()) {
            println!();
            println!("{} {}", "Planned routes for".bold(), provider.provider_id().bold());
            println!("{}", planned_table(provider));
        }
    }

    println!();
    if let Some(fatal) = &report.fatal {
        println!("{} {}", "Run aborted:".red().bold(), fatal);
    } else if report.succeeded() {
        let verb = if report.dry_run { "planned" } else { "provisioned" };
        println!(
            "{} {} of {} provider(s) {verb} in {}ms",
            "✓".green(),
            report
                .providers
                .iter()
                .filter(|p| p.phase().counts_as_success())
                .count(),
            report.providers.len(),
            report.duration_ms
        );
    } else {
        println!("{} no provider was provisioned", "✗".red());
    }
}

fn status_table(report: &RunReport) -> Table {
    let mut builder =
        Table::builder().headers(&["PROVIDER", "STATE", "ROUTES", "VERIFIED", "DETAIL"]);

    for provider in &report.providers {
        builder = builder.add_cells(vec![
            Cell::new(provider.provider_id()),
            phase_cell(provider.phase()),
            Cell::new(routes_column(provider)),
            Cell::new(match provider.verified {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            }),
            Cell::new(detail_column(provider)),
        ]);
    }
    for id in &report.disabled {
        builder = builder.add_cells(vec![
            Cell::new(id),
            Cell::new("DISABLED").fg(Color::DarkGrey),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(""),
        ]);
    }
    builder.build()
}

fn routes_column(provider: &ProviderReport) -> String {
    let state = &provider.state;
    match provider.phase() {
        ProviderPhase::Planned => format!("{} planned", provider.planned_routes.len()),
        _ if state.attempted.is_empty() => "-".to_string(),
        _ => format!("{}/{}", state.succeeded.len(), state.attempted.len()),
    }
}

fn detail_column(provider: &ProviderReport) -> String {
    let mut parts = Vec::new();
    if let Some(error) = &provider.error {
        parts.push(error.clone());
    }
    if !provider.state.failed.is_empty() {
        let failed: Vec<String> = provider
            .state
            .failed
            .iter()
            .map(|f| match f.status {
                Some(status) => format!("{} ({status})", f.operation),
                None => format!("{} ({})", f.operation, f.message),
            })
            .collect();
        parts.push(format!("failed: {}", failed.join(", ")));
    }
    if provider.state.rolled_back {
        parts.push("rolled back".to_string());
    }
    if provider.trust == Some(TrustMode::Relaxed) {
        parts.push("spec fetched with relaxed TLS".to_string());
    }
    parts.join("; ")
}

fn planned_table(provider: &ProviderReport) -> Table {
    let mut builder = Table::builder().headers(&["ROUTE ID", "METHOD", "MATCH", "UPSTREAM", "REWRITE"]);
    for route in &provider.planned_routes {
        let node = route.upstream_target.node();
        let rewrite = format!(
            "{} -> {}",
            route.rewrite_rule.pattern, route.rewrite_rule.replacement
        );
        builder = builder.add_row(&[
            route.route_id.as_str(),
            route.method.as_str(),
            route.match_pattern.as_str(),
            node.as_str(),
            rewrite.as_str(),
        ]);
    }
    builder.build()
}
