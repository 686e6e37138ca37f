//! In-memory identity store for reconciliation tests
//!
//! Behaves like Vault's identity engine for the calls the reconciler makes,
//! records every call, and can inject failures, stale alias listings and
//! aliases that vanish between listing and deletion.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use vault_entity_mapper::config::{EntityAliasConfig, EntityConfig, MapperConfig};
use vault_entity_mapper::identity::{
    AliasUpsert, AuthMount, EntityUpsert, IdentityStore, RemoteAlias, RemoteEntity,
};

pub const USERPASS_ACCESSOR: &str = "auth_userpass_6e1c9a3f";
pub const APPROLE_ACCESSOR: &str = "auth_approle_0b7d51e2";

#[derive(Debug, Default)]
struct State {
    entities: BTreeMap<String, RemoteEntity>,
    aliases: BTreeMap<String, RemoteAlias>,
    mounts: Vec<AuthMount>,
    calls: Vec<String>,
    next_id: u64,
    /// Alias names left out of the next listing
    hidden_from_listing: HashSet<String>,
    /// Alias ids removed right before they are read
    vanish_on_read: HashSet<String>,
    /// (operation, optional name/id) pairs that fail
    failures: HashSet<(String, Option<String>)>,
    /// (operation, name/id) pairs that fail on their next call only
    failures_once: HashSet<(String, String)>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn call(&mut self, operation: &str, key: Option<&str>) -> Result<()> {
        self.calls.push(operation.to_string());
        let all = (operation.to_string(), None);
        let keyed = (operation.to_string(), key.map(ToString::to_string));
        if self.failures.contains(&all) || self.failures.contains(&keyed) {
            bail!("injected {operation} failure");
        }
        if let Some(key) = key {
            if self
                .failures_once
                .remove(&(operation.to_string(), key.to_string()))
            {
                bail!("injected one-off {operation} failure");
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct InMemoryIdentityStore {
    state: Mutex<State>,
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityStore {
    /// Store with `userpass/` and `approle/` enabled
    pub fn new() -> Self {
        let state = State {
            mounts: vec![
                AuthMount {
                    path: "token/".to_string(),
                    method_type: "token".to_string(),
                    accessor: "auth_token_00000000".to_string(),
                },
                AuthMount {
                    path: "userpass/".to_string(),
                    method_type: "userpass".to_string(),
                    accessor: USERPASS_ACCESSOR.to_string(),
                },
                AuthMount {
                    path: "approle/".to_string(),
                    method_type: "approle".to_string(),
                    accessor: APPROLE_ACCESSOR.to_string(),
                },
            ],
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn seed_entity(&self, name: &str, policies: &[&str]) -> String {
        let mut state = self.lock();
        let id = state.next_id("entity");
        state.entities.insert(
            id.clone(),
            RemoteEntity {
                id: id.clone(),
                name: name.to_string(),
                policies: policies.iter().map(ToString::to_string).collect(),
                ..RemoteEntity::default()
            },
        );
        id
    }

    pub fn seed_alias(&self, name: &str, canonical_id: &str, mount_accessor: &str) -> String {
        let mut state = self.lock();
        let id = state.next_id("alias");
        state.aliases.insert(
            id.clone(),
            RemoteAlias {
                id: id.clone(),
                name: name.to_string(),
                canonical_id: canonical_id.to_string(),
                mount_accessor: mount_accessor.to_string(),
            },
        );
        id
    }

    /// Leave aliases called `name` out of the next listing
    pub fn hide_from_next_listing(&self, name: &str) {
        self.lock().hidden_from_listing.insert(name.to_string());
    }

    /// Delete the alias right before it is read by id
    pub fn vanish_on_read(&self, id: &str) {
        self.lock().vanish_on_read.insert(id.to_string());
    }

    /// Make every call to `operation` fail
    pub fn fail(&self, operation: &str) {
        self.lock().failures.insert((operation.to_string(), None));
    }

    /// Make calls to `operation` for one name (or id) fail
    pub fn fail_for(&self, operation: &str, key: &str) {
        self.lock()
            .failures
            .insert((operation.to_string(), Some(key.to_string())));
    }

    /// Make the next call to `operation` for one name (or id) fail
    pub fn fail_once_for(&self, operation: &str, key: &str) {
        self.lock()
            .failures_once
            .insert((operation.to_string(), key.to_string()));
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.failures.clear();
        state.failures_once.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn entity_named(&self, name: &str) -> Option<RemoteEntity> {
        self.lock()
            .entities
            .values()
            .find(|e| e.name == name)
            .cloned()
    }

    pub fn entities_named(&self, name: &str) -> usize {
        self.lock()
            .entities
            .values()
            .filter(|e| e.name == name)
            .count()
    }

    pub fn aliases_named(&self, name: &str) -> Vec<RemoteAlias> {
        self.lock()
            .aliases
            .values()
            .filter(|a| a.name == name)
            .cloned()
            .collect()
    }

    /// Every entity and alias currently stored
    pub fn snapshot(&self) -> (Vec<RemoteEntity>, Vec<RemoteAlias>) {
        let state = self.lock();
        (
            state.entities.values().cloned().collect(),
            state.aliases.values().cloned().collect(),
        )
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn lookup_entity_by_name(&self, name: &str) -> Result<Option<RemoteEntity>> {
        let mut state = self.lock();
        state.call("lookup_entity", Some(name))?;
        Ok(state.entities.values().find(|e| e.name == name).cloned())
    }

    async fn upsert_entity(&self, entity: &EntityUpsert) -> Result<String> {
        let mut state = self.lock();
        state.call("upsert_entity", Some(entity.name.as_str()))?;
        // Writing with an id updates that entity; Vault rejects unknown ids
        let id = match &entity.id {
            Some(id) if state.entities.contains_key(id) => id.clone(),
            Some(id) => bail!("invalid entity ID {id}"),
            None => state.next_id("entity"),
        };
        state.entities.insert(
            id.clone(),
            RemoteEntity {
                id: id.clone(),
                name: entity.name.clone(),
                metadata: entity.metadata.clone(),
                policies: entity.policies.clone(),
                disabled: entity.disabled,
            },
        );
        Ok(id)
    }

    async fn batch_delete_entities(&self, ids: &[String]) -> Result<()> {
        let mut state = self.lock();
        state.call("batch_delete_entities", None)?;
        for id in ids {
            state.entities.remove(id);
        }
        // Deleting an entity removes its aliases
        state
            .aliases
            .retain(|_, alias| !ids.contains(&alias.canonical_id));
        Ok(())
    }

    async fn list_enabled_auth_methods(&self) -> Result<Vec<AuthMount>> {
        let mut state = self.lock();
        state.call("list_auth_methods", None)?;
        Ok(state.mounts.clone())
    }

    async fn upsert_alias(&self, alias: &AliasUpsert) -> Result<String> {
        let mut state = self.lock();
        state.call("upsert_alias", Some(alias.name.as_str()))?;

        if !state.entities.contains_key(&alias.canonical_id) {
            bail!("invalid canonical ID {}", alias.canonical_id);
        }
        if !state
            .mounts
            .iter()
            .any(|m| m.accessor == alias.mount_accessor)
        {
            bail!("invalid mount accessor {}", alias.mount_accessor);
        }

        // Without an id, an alias with the same name on the same mount is updated
        let existing = state
            .aliases
            .values()
            .find(|a| a.name == alias.name && a.mount_accessor == alias.mount_accessor)
            .map(|a| a.id.clone());
        let id = match (&alias.id, existing) {
            (Some(id), _) if state.aliases.contains_key(id) => id.clone(),
            (Some(id), _) => bail!("invalid alias ID {id}"),
            (None, Some(id)) => id,
            (None, None) => state.next_id("alias"),
        };

        state.aliases.insert(
            id.clone(),
            RemoteAlias {
                id: id.clone(),
                name: alias.name.clone(),
                canonical_id: alias.canonical_id.clone(),
                mount_accessor: alias.mount_accessor.clone(),
            },
        );
        Ok(id)
    }

    async fn list_aliases_by_id(&self) -> Result<BTreeMap<String, RemoteAlias>> {
        let mut state = self.lock();
        state.call("list_aliases", None)?;
        let hidden = std::mem::take(&mut state.hidden_from_listing);
        Ok(state
            .aliases
            .iter()
            .filter(|(_, alias)| !hidden.contains(&alias.name))
            .map(|(id, alias)| (id.clone(), alias.clone()))
            .collect())
    }

    async fn read_alias_by_id(&self, id: &str) -> Result<Option<RemoteAlias>> {
        let mut state = self.lock();
        state.call("read_alias", Some(id))?;
        if state.vanish_on_read.remove(id) {
            state.aliases.remove(id);
        }
        Ok(state.aliases.get(id).cloned())
    }

    async fn delete_alias_by_id(&self, id: &str) -> Result<bool> {
        let mut state = self.lock();
        state.call("delete_alias", Some(id))?;
        Ok(state.aliases.remove(id).is_some())
    }
}

pub fn entity(name: &str, policies: &[&str]) -> EntityConfig {
    EntityConfig {
        name: name.to_string(),
        policies: policies.iter().map(ToString::to_string).collect(),
        ..EntityConfig::default()
    }
}

pub fn deactivated_entity(name: &str) -> EntityConfig {
    EntityConfig {
        name: name.to_string(),
        deactivated: true,
        ..EntityConfig::default()
    }
}

/// Alias bound by entity name and auth backend name
pub fn alias(name: &str, entity_name: &str, backend: &str) -> EntityAliasConfig {
    EntityAliasConfig {
        name: name.to_string(),
        entity_name_ref: Some(entity_name.to_string()),
        auth_backend: Some(backend.to_string()),
        ..EntityAliasConfig::default()
    }
}

pub fn deactivated_alias(name: &str) -> EntityAliasConfig {
    EntityAliasConfig {
        name: name.to_string(),
        deactivated: true,
        ..EntityAliasConfig::default()
    }
}

pub fn mapping(entities: Vec<EntityConfig>, aliases: Vec<EntityAliasConfig>) -> MapperConfig {
    MapperConfig {
        entities,
        entity_aliases: aliases,
    }
}
