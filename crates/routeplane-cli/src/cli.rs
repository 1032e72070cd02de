//! CLI command definitions using clap

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Routeplane - publish upstream API providers through an API gateway
#[derive(Parser)]
#[command(name = "routeplane")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short = 'o', long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Configuration file path (.yaml, .toml or .json)
    #[arg(
        short = 'c',
        long,
        global = true,
        env = "ROUTEPLANE_CONFIG",
        default_value = "routeplane.yaml"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch provider descriptions and create their routes on the gateway
    Provision {
        /// Synthesize and print routes without touching the gateway
        #[arg(long)]
        dry_run: bool,

        /// Only provision the provider with this id
        #[arg(short, long)]
        provider: Option<String>,

        /// Write the full JSON run report to this file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// List routes managed on the gateway
    Routes {
        /// Only list routes of this provider
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Validate the configuration file without any network I/O
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_provision_flags() {
        let cli = Cli::try_parse_from([
            "routeplane",
            "-c",
            "gw.toml",
            "provision",
            "--dry-run",
            "--provider",
            "acme-1",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("gw.toml"));
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Provision {
                dry_run,
                provider,
                snapshot,
            } => {
                assert!(dry_run);
                assert_eq!(provider.as_deref(), Some("acme-1"));
                assert!(snapshot.is_none());
            }
            _ => panic!("expected provision"),
        }
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["routeplane", "check"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Table);
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Check));
    }
}
