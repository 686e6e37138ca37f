//! # Response Types
//!
//! Vault identity API response bodies, decoded once here and converted into
//! the store-agnostic records in [`crate::identity`].

use crate::config::Metadata;
use crate::identity::{AuthMount, RemoteAlias, RemoteEntity};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Standard Vault response envelope; only `data` is used
#[derive(Debug, Deserialize)]
pub struct VaultResponse<T> {
    pub data: T,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Default, Deserialize)]
pub struct VaultErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}

/// `data` of an entity lookup or read.
/// Vault reports empty metadata and policies as `null`.
#[derive(Debug, Deserialize)]
pub struct EntityData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub policies: Option<Vec<String>>,
    #[serde(default)]
    pub disabled: bool,
}

impl From<EntityData> for RemoteEntity {
    fn from(data: EntityData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            metadata: data.metadata.unwrap_or_default(),
            policies: data.policies.unwrap_or_default(),
            disabled: data.disabled,
        }
    }
}

/// `data` returned when an entity or alias is created
#[derive(Debug, Deserialize)]
pub struct IdData {
    pub id: String,
}

/// One entry of `GET /v1/sys/auth`
#[derive(Debug, Deserialize)]
pub struct AuthMountData {
    #[serde(rename = "type")]
    pub method_type: String,
    pub accessor: String,
}

/// Convert the `sys/auth` map (keyed by mount path) into mounts
#[must_use]
pub fn auth_mounts(data: BTreeMap<String, AuthMountData>) -> Vec<AuthMount> {
    data.into_iter()
        .map(|(path, mount)| AuthMount {
            path,
            method_type: mount.method_type,
            accessor: mount.accessor,
        })
        .collect()
}

/// `data` of a single alias read
#[derive(Debug, Deserialize)]
pub struct AliasData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub canonical_id: String,
    #[serde(default)]
    pub mount_accessor: String,
}

impl From<AliasData> for RemoteAlias {
    fn from(data: AliasData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            canonical_id: data.canonical_id,
            mount_accessor: data.mount_accessor,
        }
    }
}

/// `data` of `LIST /v1/identity/entity-alias/id`
#[derive(Debug, Default, Deserialize)]
pub struct AliasListData {
    #[serde(default)]
    pub key_info: BTreeMap<String, AliasKeyInfo>,
}

/// Per-alias summary inside `key_info`
#[derive(Debug, Deserialize)]
pub struct AliasKeyInfo {
    pub name: String,
    #[serde(default)]
    pub canonical_id: String,
    #[serde(default)]
    pub mount_accessor: String,
}

impl AliasListData {
    /// Aliases keyed by id
    #[must_use]
    pub fn into_aliases(self) -> BTreeMap<String, RemoteAlias> {
        self.key_info
            .into_iter()
            .map(|(id, info)| {
                let alias = RemoteAlias {
                    id: id.clone(),
                    name: info.name,
                    canonical_id: info.canonical_id,
                    mount_accessor: info.mount_accessor,
                };
                (id, alias)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_with_null_fields() {
        let body = r#"{"data": {"id": "e-1", "name": "bot1", "metadata": null, "policies": null, "disabled": false}}"#;
        let response: VaultResponse<EntityData> = serde_json::from_str(body).unwrap();
        let entity = RemoteEntity::from(response.data);
        assert_eq!(entity.id, "e-1");
        assert!(entity.metadata.is_empty());
        assert!(entity.policies.is_empty());
    }

    #[test]
    fn test_alias_listing() {
        let body = r#"{"data": {
            "keys": ["a-1", "a-2"],
            "key_info": {
                "a-1": {"name": "bot1-alias", "canonical_id": "e-1", "mount_accessor": "auth_userpass_1", "mount_type": "userpass"},
                "a-2": {"name": "svc-a", "canonical_id": "e-2", "mount_accessor": "auth_approle_2", "mount_type": "approle"}
            }
        }}"#;
        let response: VaultResponse<AliasListData> = serde_json::from_str(body).unwrap();
        let aliases = response.data.into_aliases();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases["a-2"].name, "svc-a");
        assert_eq!(aliases["a-1"].mount_accessor, "auth_userpass_1");
    }

    #[test]
    fn test_auth_mounts() {
        let body = r#"{"data": {
            "token/": {"type": "token", "accessor": "auth_token_0", "description": "token based credentials"},
            "userpass/": {"type": "userpass", "accessor": "auth_userpass_1", "local": false}
        }}"#;
        let response: VaultResponse<BTreeMap<String, AuthMountData>> =
            serde_json::from_str(body).unwrap();
        let mounts = auth_mounts(response.data);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[1].path, "userpass/");
        assert_eq!(mounts[1].accessor, "auth_userpass_1");
    }

    #[test]
    fn test_error_body() {
        let err: VaultErrorResponse =
            serde_json::from_str(r#"{"errors": ["permission denied"]}"#).unwrap();
        assert_eq!(err.errors, vec!["permission denied"]);
    }
}
