//! # Configuration
//!
//! - `mapping`: the declared entities and aliases to reconcile
//! - `vault`: Vault client settings loaded from environment variables

pub mod mapping;
pub mod vault;

pub use mapping::{BackendRef, EntityAliasConfig, EntityConfig, EntityRef, MapperConfig, Metadata};
pub use vault::VaultSettings;
