//! Vault Entity Mapper Library
//!
//! Reconciles a declarative list of Vault identity entities and entity
//! aliases against a Vault server. See [`reconciler`] for the algorithm and
//! [`identity`] for the store interface it drives.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod observability;
pub mod reconciler;

pub use config::MapperConfig;
pub use error::{ConfigError, ReconcileError};
pub use identity::IdentityStore;
pub use reconciler::{ReconcileSummary, Reconciler};
