//! # Validation
//!
//! Configuration-level checks run before any call to the store.
//!
//! Alias names must be unique: two declarations with the same name would
//! bind one login to several entities (alias reuse), handing it the union of
//! their privileges.

use crate::config::MapperConfig;
use crate::error::ConfigError;
use std::collections::HashSet;
use tracing::warn;

/// Validate the mapping document
///
/// # Errors
/// Returns the first violated invariant
pub fn validate_config(config: &MapperConfig) -> Result<(), ConfigError> {
    let mut entity_names = HashSet::new();
    for (index, entity) in config.entities.iter().enumerate() {
        if entity.name.trim().is_empty() {
            return Err(ConfigError::EmptyEntityName { index });
        }
        if !entity_names.insert(entity.name.as_str()) {
            warn!(
                "Entity {} is declared more than once; the first declaration resolves its id",
                entity.name
            );
        }
    }

    let mut alias_names = HashSet::new();
    for (index, alias) in config.entity_aliases.iter().enumerate() {
        if alias.name.trim().is_empty() {
            return Err(ConfigError::EmptyAliasName { index });
        }
        if !alias_names.insert(alias.name.as_str()) {
            return Err(ConfigError::DuplicateAliasName(alias.name.clone()));
        }
        // Deactivated aliases are matched by name only
        if alias.deactivated {
            continue;
        }
        if alias.entity_ref().is_none() {
            return Err(ConfigError::EntityReference {
                alias: alias.name.clone(),
            });
        }
        if alias.backend_ref().is_none() {
            return Err(ConfigError::BackendReference {
                alias: alias.name.clone(),
            });
        }
    }

    Ok(())
}
