//! # Mapping Document
//!
//! Declared state: the entities and entity aliases Vault should end up with.
//!
//! ```yaml
//! entities:
//!   - name: bot1
//!     metadata:
//!       team: infra
//!     policies: [read]
//! entitiesAliases:
//!   - name: bot1-alias
//!     entityNameRef: bot1
//!     authBackEnd: userpass
//! ```
//!
//! YAML is the default format; files ending in `.json` are parsed as JSON.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

/// Entity metadata. Vault keeps every value as a string, so scalar values in
/// the document are converted when it is loaded (`tier: 2` becomes `"2"`).
pub type Metadata = BTreeMap<String, String>;

/// Root of the mapping document
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapperConfig {
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
    #[serde(default, rename = "entitiesAliases")]
    pub entity_aliases: Vec<EntityAliasConfig>,
}

/// Declared entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    pub name: String,
    /// Pre-assigned entity id, used when Vault has no entity with this name yet
    #[serde(default, deserialize_with = "empty_as_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "metadata_as_strings")]
    pub metadata: Metadata,
    #[serde(default)]
    pub policies: Vec<String>,
    /// Vault-side soft disable
    #[serde(default)]
    pub disabled: bool,
    /// Remove the entity from Vault
    #[serde(default, alias = "deactived")]
    pub deactivated: bool,
}

/// Declared entity alias
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAliasConfig {
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub canonical_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub entity_name_ref: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub mount_accessor: Option<String>,
    #[serde(default, rename = "authBackEnd", deserialize_with = "empty_as_none")]
    pub auth_backend: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub id: Option<String>,
    #[serde(default, alias = "deactived")]
    pub deactivated: bool,
}

/// How an alias points at its owning entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef<'a> {
    CanonicalId(&'a str),
    EntityName(&'a str),
}

/// How an alias points at its auth backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRef<'a> {
    MountAccessor(&'a str),
    AuthBackend(&'a str),
}

impl EntityAliasConfig {
    /// Entity reference, or `None` unless exactly one of `canonicalId` /
    /// `entityNameRef` is set
    #[must_use]
    pub fn entity_ref(&self) -> Option<EntityRef<'_>> {
        match (self.canonical_id.as_deref(), self.entity_name_ref.as_deref()) {
            (Some(id), None) => Some(EntityRef::CanonicalId(id)),
            (None, Some(name)) => Some(EntityRef::EntityName(name)),
            _ => None,
        }
    }

    /// Backend reference, or `None` unless exactly one of `mountAccessor` /
    /// `authBackEnd` is set
    #[must_use]
    pub fn backend_ref(&self) -> Option<BackendRef<'_>> {
        match (self.mount_accessor.as_deref(), self.auth_backend.as_deref()) {
            (Some(accessor), None) => Some(BackendRef::MountAccessor(accessor)),
            (None, Some(backend)) => Some(BackendRef::AuthBackend(backend)),
            _ => None,
        }
    }
}

impl MapperConfig {
    /// Load the mapping document from disk
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&raw).map_err(|e| e.to_string())
        } else {
            Self::from_yaml_str(&raw).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse a YAML mapping document. An empty document is an empty mapping.
    ///
    /// # Errors
    /// Returns the YAML error if the document does not match the schema
    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Scalar metadata value as written in the document
#[derive(Deserialize)]
#[serde(untagged, expecting = "a string, number or boolean metadata value")]
enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    fn into_string(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Unsigned(u) => u.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s,
        }
    }
}

/// Metadata map with every value in Vault's string form; null becomes `""`
fn metadata_as_strings<'de, D>(deserializer: D) -> Result<Metadata, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Option<MetadataValue>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| (key, value.map(MetadataValue::into_string).unwrap_or_default()))
        .collect())
}

/// Treat missing, null and empty strings the same way
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
