//! # Identity Store
//!
//! Abstract interface to the remote identity store.
//!
//! The reconciler only talks to the store through [`IdentityStore`], so the
//! Vault HTTP client can be swapped for an in-memory store in tests. All
//! responses are decoded into the typed records below at the client boundary.
//!
//! Lookups are tri-state: `Ok(Some(_))` found, `Ok(None)` not found, `Err(_)`
//! the call itself failed. Only `Ok(None)` means "absent".

use crate::config::Metadata;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod vault;

/// Entity as stored remotely
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteEntity {
    pub id: String,
    pub name: String,
    pub metadata: Metadata,
    pub policies: Vec<String>,
    pub disabled: bool,
}

/// Entity alias as stored remotely
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteAlias {
    pub id: String,
    pub name: String,
    pub canonical_id: String,
    pub mount_accessor: String,
}

/// Enabled auth method mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMount {
    /// Mount path as reported by the store, e.g. `userpass/`
    pub path: String,
    /// Backend type, e.g. `userpass`
    pub method_type: String,
    pub accessor: String,
}

/// Create-or-update request for an entity.
/// `id: None` lets the store assign one.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpsert {
    pub id: Option<String>,
    pub name: String,
    pub metadata: Metadata,
    pub policies: Vec<String>,
    pub disabled: bool,
}

/// Create-or-update request for an entity alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasUpsert {
    pub id: Option<String>,
    pub name: String,
    pub canonical_id: String,
    pub mount_accessor: String,
}

/// Remote identity store operations used by the reconciler
#[async_trait]
pub trait IdentityStore: Send + Sync + std::fmt::Debug {
    /// Look up an entity by name
    async fn lookup_entity_by_name(&self, name: &str) -> Result<Option<RemoteEntity>>;

    /// Create an entity, or update it in place when `id` is set.
    /// Returns the entity id.
    async fn upsert_entity(&self, entity: &EntityUpsert) -> Result<String>;

    /// Delete several entities in one call
    async fn batch_delete_entities(&self, ids: &[String]) -> Result<()>;

    /// List enabled auth method mounts
    async fn list_enabled_auth_methods(&self) -> Result<Vec<AuthMount>>;

    /// Create an alias, or update it in place when `id` is set.
    /// Returns the alias id.
    async fn upsert_alias(&self, alias: &AliasUpsert) -> Result<String>;

    /// List all aliases keyed by id
    async fn list_aliases_by_id(&self) -> Result<BTreeMap<String, RemoteAlias>>;

    /// Read an alias by id
    async fn read_alias_by_id(&self, id: &str) -> Result<Option<RemoteAlias>>;

    /// Delete an alias by id. Returns `false` if it did not exist.
    async fn delete_alias_by_id(&self, id: &str) -> Result<bool>;
}
