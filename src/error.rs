//! # Errors
//!
//! Fatal error types. Anything in here aborts the run; per-object failures are
//! recorded in the [`ReconcileSummary`](crate::reconciler::ReconcileSummary)
//! instead.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be loaded or breaks a configuration-level invariant
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("duplicated alias name: {0}")]
    DuplicateAliasName(String),

    #[error("entity #{index} has an empty name")]
    EmptyEntityName { index: usize },

    #[error("alias #{index} has an empty name")]
    EmptyAliasName { index: usize },

    #[error("alias {alias} must reference its entity by exactly one of canonicalId or entityNameRef")]
    EntityReference { alias: String },

    #[error("alias {alias} must reference its auth backend by exactly one of mountAccessor or authBackEnd")]
    BackendReference { alias: String },
}

/// Error that aborts a reconciliation run
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to list enabled auth methods: {0:#}")]
    AuthMethods(#[source] anyhow::Error),
}
