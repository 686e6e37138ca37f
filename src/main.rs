//! # Vault Entity Mapper
//!
//! Reconciles Vault identity entities and entity aliases against a mapping
//! document, then exits.
//!
//! ## Overview
//!
//! 1. **Load the mapping** - Reads the YAML/JSON document given by `--config`
//! 2. **Validate** - Rejects duplicate alias names and broken references before any Vault call
//! 3. **Entities** - Creates/updates declared entities, collects deactivated ones
//! 4. **Aliases** - Resolves entity and auth backend names, writes aliases, deletes deactivated ones
//! 5. **Cleanup** - Deletes deactivated entities in one batch call
//!
//! Vault connection settings come from `VAULT_ADDR`, `VAULT_TOKEN`,
//! `VAULT_NAMESPACE`, `VAULT_CLIENT_TIMEOUT` and `VAULT_SKIP_VERIFY`.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use vault_entity_mapper::cli::{Cli, Command};
use vault_entity_mapper::config::{MapperConfig, VaultSettings};
use vault_entity_mapper::identity::vault::VaultClient;
use vault_entity_mapper::observability::{logging, metrics};
use vault_entity_mapper::reconciler::{validate_config, Reconciler};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_format);

    info!(
        "Starting vault-entity-mapper {} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    let config = MapperConfig::from_path(&cli.config)?;
    info!(
        "Loaded {} entities and {} entity aliases from {}",
        config.entities.len(),
        config.entity_aliases.len(),
        cli.config.display()
    );

    match cli.selected_command() {
        Command::Validate => {
            validate_config(&config)?;
            info!("Configuration is valid");
            Ok(ExitCode::SUCCESS)
        }
        Command::Apply => apply(&cli, &config).await,
    }
}

async fn apply(cli: &Cli, config: &MapperConfig) -> Result<ExitCode> {
    // Configure rustls crypto provider before any TLS connection is made
    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    metrics::register_metrics().context("Failed to register metrics")?;

    let settings = VaultSettings::from_env().context("Failed to load Vault settings")?;
    let client = VaultClient::new(&settings)?;

    let result = Reconciler::new(&client).run(config).await;

    if let Some(path) = &cli.metrics_file {
        if let Err(e) = metrics::write_textfile(path) {
            error!("Failed to write metrics file: {:#}", e);
        }
    }

    let summary = result?;
    if summary.has_failures() {
        warn!(
            "{} objects failed to reconcile; re-run once the cause is fixed",
            summary.failures.len()
        );
        if cli.strict {
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}
