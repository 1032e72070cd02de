//! `routeplane routes`

use super::load_validated;
use crate::error::CliError;
use crate::output::{OutputFormat, Table, print_json};
use routeplane_kernel::{GatewayAdmin, RouteDefinition};
use routeplane_provisioner::admin::AdminApiClient;
use routeplane_provisioner::synth::RouteSynthesizer;
use std::path::Path;
use std::process::ExitCode;

pub async fn run(
    config_path: &Path,
    provider: Option<&str>,
    format: OutputFormat,
) -> Result<ExitCode, CliError> {
    let config = load_validated(config_path)?;
    let synthesizer = RouteSynthesizer::new(config.gateway.route_prefix.clone());
    let prefix = match provider {
        Some(id) => synthesizer.provider_prefix(id),
        None => format!("/{}/", synthesizer.prefix()),
    };

    let gateway = AdminApiClient::new(config.gateway.admin_client_config())?;
    let routes: Vec<RouteDefinition> = gateway
        .list_routes(&prefix)
        .await?
        .iter()
        .map(RouteDefinition::redacted)
        .collect();

    match format {
        OutputFormat::Json => print_json(&routes)?,
        OutputFormat::Table if routes.is_empty() => println!("No managed routes under {prefix}"),
        OutputFormat::Table => println!("{}", routes_table(&routes)),
    }
    Ok(ExitCode::SUCCESS)
}

fn routes_table(routes: &[RouteDefinition]) -> Table {
    let mut builder =
        Table::builder().headers(&["PROVIDER", "METHOD", "MATCH", "UPSTREAM", "ROUTE ID"]);
    for route in routes {
        let node = route.upstream_target.node();
        builder = builder.add_row(&[
            route.provider_id.as_str(),
            route.method.as_str(),
            route.match_pattern.as_str(),
            node.as_str(),
            route.route_id.as_str(),
        ]);
    }
    builder.build()
}
