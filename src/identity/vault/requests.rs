//! # Request Types
//!
//! Vault identity API request bodies.
//!
//! API Reference: https://developer.hashicorp.com/vault/api-docs/secret/identity

use crate::config::Metadata;
use crate::identity::{AliasUpsert, EntityUpsert};
use serde::Serialize;

/// Request body for `POST /v1/identity/lookup/entity`
#[derive(Debug, Serialize)]
pub struct LookupEntityRequest<'a> {
    pub name: &'a str,
}

/// Request body for `POST /v1/identity/entity`
///
/// When `id` is set Vault updates that entity in place instead of creating one.
#[derive(Debug, Serialize)]
pub struct EntityRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub metadata: &'a Metadata,
    pub policies: &'a [String],
    pub disabled: bool,
}

impl<'a> From<&'a EntityUpsert> for EntityRequest<'a> {
    fn from(entity: &'a EntityUpsert) -> Self {
        Self {
            name: &entity.name,
            id: entity.id.as_deref(),
            metadata: &entity.metadata,
            policies: &entity.policies,
            disabled: entity.disabled,
        }
    }
}

/// Request body for `POST /v1/identity/entity/batch-delete`
#[derive(Debug, Serialize)]
pub struct BatchDeleteRequest<'a> {
    pub entity_ids: &'a [String],
}

/// Request body for `POST /v1/identity/entity-alias` and
/// `POST /v1/identity/entity-alias/id/:id`
#[derive(Debug, Serialize)]
pub struct AliasRequest<'a> {
    pub name: &'a str,
    pub canonical_id: &'a str,
    pub mount_accessor: &'a str,
}

impl<'a> From<&'a AliasUpsert> for AliasRequest<'a> {
    fn from(alias: &'a AliasUpsert) -> Self {
        Self {
            name: &alias.name,
            canonical_id: &alias.canonical_id,
            mount_accessor: &alias.mount_accessor,
        }
    }
}
