//! Routeplane CLI - provision gateway routes for upstream API providers

mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use error::CliError;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose; logs go to stderr so stdout holds the report
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(run_command(cli)) {
        Ok(code) => Ok(code),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

async fn run_command(cli: Cli) -> Result<ExitCode, CliError> {
    let format = cli.output;
    match cli.command {
        Commands::Provision {
            dry_run,
            provider,
            snapshot,
        } => {
            commands::provision::run(
                &cli.config,
                commands::provision::ProvisionArgs {
                    dry_run,
                    provider,
                    snapshot,
                },
                format,
            )
            .await
        }
        Commands::Routes { provider } => {
            commands::routes::run(&cli.config, provider.as_deref(), format).await
        }
        Commands::Check => commands::check::run(&cli.config, format),
    }
}
