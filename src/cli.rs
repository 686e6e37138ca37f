//! # CLI
//!
//! Command-line interface of the `vault-entity-mapper` binary.
//!
//! ## Usage
//!
//! ```bash
//! # Reconcile Vault against config.yaml (VAULT_ADDR / VAULT_TOKEN from the environment)
//! vault-entity-mapper --config config.yaml
//!
//! # Only check the mapping document
//! vault-entity-mapper --config config.yaml validate
//!
//! # Fail the run on any per-object error and export metrics
//! vault-entity-mapper --strict --metrics-file /var/lib/node_exporter/vault_entity_mapper.prom
//! ```

use crate::constants::DEFAULT_CONFIG_PATH;
use crate::observability::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Map declared identity entities and aliases onto Vault
#[derive(Debug, Parser)]
#[command(name = "vault-entity-mapper", version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the mapping document (YAML, or JSON with a .json extension)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Exit non-zero when any single entity or alias failed to reconcile
    #[arg(long)]
    pub strict: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Write Prometheus metrics to this file after the run
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Reconcile Vault against the mapping document (default)
    Apply,
    /// Load and validate the mapping document without contacting Vault
    Validate,
}

impl Cli {
    #[must_use]
    pub fn selected_command(&self) -> Command {
        self.command.unwrap_or(Command::Apply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["vault-entity-mapper"]).unwrap();
        assert_eq!(cli.selected_command(), Command::Apply);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.strict);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert_eq!(cli.metrics_file, None);
    }

    #[test]
    fn test_validate_subcommand_with_global_config() {
        let cli = Cli::try_parse_from([
            "vault-entity-mapper",
            "validate",
            "--config",
            "mapping.json",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.selected_command(), Command::Validate);
        assert_eq!(cli.config, PathBuf::from("mapping.json"));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from([
            "vault-entity-mapper",
            "--strict",
            "--metrics-file",
            "/tmp/mapper.prom",
            "apply",
        ])
        .unwrap();
        assert!(cli.strict);
        assert_eq!(cli.metrics_file, Some(PathBuf::from("/tmp/mapper.prom")));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        <Cli as CommandFactory>::command().debug_assert();
    }
}
