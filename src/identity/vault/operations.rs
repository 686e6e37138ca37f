//! # Identity Operations
//!
//! Implementation of [`IdentityStore`] for [`VaultClient`].

use super::requests::{AliasRequest, BatchDeleteRequest, EntityRequest, LookupEntityRequest};
use super::responses::{
    auth_mounts, AliasData, AliasListData, AuthMountData, EntityData, IdData, VaultResponse,
};
use super::tracker::OperationTracker;
use super::{
    VaultClient, ALIAS_BY_ID_PATH, ALIAS_PATH, AUTH_METHODS_PATH, ENTITY_BATCH_DELETE_PATH,
    ENTITY_PATH, LOOKUP_ENTITY_PATH,
};
use crate::identity::{
    AliasUpsert, AuthMount, EntityUpsert, IdentityStore, RemoteAlias, RemoteEntity,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::collections::BTreeMap;
use tracing::{debug, debug_span, Instrument};

/// Use the id Vault returned, or the one we sent when Vault answered without a body
fn returned_or_sent_id(
    body: Option<VaultResponse<Option<IdData>>>,
    sent: Option<&str>,
    what: &str,
) -> Result<String> {
    body.and_then(|b| b.data)
        .map(|data| data.id)
        .or_else(|| sent.map(ToString::to_string))
        .ok_or_else(|| anyhow!("Vault did not return an id for {what}"))
}

#[async_trait]
impl IdentityStore for VaultClient {
    async fn lookup_entity_by_name(&self, name: &str) -> Result<Option<RemoteEntity>> {
        let span = debug_span!("vault.entity.lookup", entity.name = name);
        async move {
            let tracker = OperationTracker::new("lookup_entity");
            let request = self
                .make_request(Method::POST, LOOKUP_ENTITY_PATH)
                .json(&LookupEntityRequest { name });
            let response = tracker.send(request).await?;

            match response.status() {
                // Vault answers an unknown name with 204
                StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                    tracker.record_not_found();
                    debug!("Entity {} not found in Vault", name);
                    Ok(None)
                }
                status if status.is_success() => {
                    let body: VaultResponse<EntityData> = tracker.decode(response).await?;
                    Ok(Some(body.data.into()))
                }
                _ => Err(tracker
                    .fail(response)
                    .await
                    .context(format!("Failed to look up entity {name}"))),
            }
        }
        .instrument(span)
        .await
    }

    async fn upsert_entity(&self, entity: &EntityUpsert) -> Result<String> {
        let span = debug_span!("vault.entity.upsert", entity.name = %entity.name);
        async move {
            let tracker = OperationTracker::new("upsert_entity");
            let request = self
                .make_request(Method::POST, ENTITY_PATH)
                .json(&EntityRequest::from(entity));
            let response = tracker.send(request).await?;

            if !response.status().is_success() {
                return Err(tracker
                    .fail(response)
                    .await
                    .context(format!("Failed to write entity {}", entity.name)));
            }

            let body = tracker.decode_optional(response).await?;
            returned_or_sent_id(body, entity.id.as_deref(), &entity.name)
        }
        .instrument(span)
        .await
    }

    async fn batch_delete_entities(&self, ids: &[String]) -> Result<()> {
        let span = debug_span!("vault.entity.batch_delete", entity.count = ids.len());
        async move {
            let tracker = OperationTracker::new("batch_delete_entities");
            let request = self
                .make_request(Method::POST, ENTITY_BATCH_DELETE_PATH)
                .json(&BatchDeleteRequest { entity_ids: ids });
            let response = tracker.send(request).await?;

            if response.status().is_success() {
                tracker.record_success();
                Ok(())
            } else {
                Err(tracker
                    .fail(response)
                    .await
                    .context(format!("Failed to delete {} entities", ids.len())))
            }
        }
        .instrument(span)
        .await
    }

    async fn list_enabled_auth_methods(&self) -> Result<Vec<AuthMount>> {
        let tracker = OperationTracker::new("list_auth_methods");
        let response = tracker
            .send(self.make_request(Method::GET, AUTH_METHODS_PATH))
            .await?;

        if !response.status().is_success() {
            return Err(tracker
                .fail(response)
                .await
                .context("Failed to list enabled auth methods"));
        }

        let body: VaultResponse<BTreeMap<String, AuthMountData>> =
            tracker.decode(response).await?;
        Ok(auth_mounts(body.data))
    }

    async fn upsert_alias(&self, alias: &AliasUpsert) -> Result<String> {
        let span = debug_span!("vault.alias.upsert", alias.name = %alias.name);
        async move {
            let tracker = OperationTracker::new("upsert_alias");
            let path = match &alias.id {
                Some(id) => format!("{ALIAS_BY_ID_PATH}/{id}"),
                None => ALIAS_PATH.to_string(),
            };
            let request = self
                .make_request(Method::POST, &path)
                .json(&AliasRequest::from(alias));
            let response = tracker.send(request).await?;

            if !response.status().is_success() {
                return Err(tracker
                    .fail(response)
                    .await
                    .context(format!("Failed to write entity alias {}", alias.name)));
            }

            let body = tracker.decode_optional(response).await?;
            returned_or_sent_id(body, alias.id.as_deref(), &alias.name)
        }
        .instrument(span)
        .await
    }

    async fn list_aliases_by_id(&self) -> Result<BTreeMap<String, RemoteAlias>> {
        let tracker = OperationTracker::new("list_aliases");
        let request = self
            .make_request(Method::GET, ALIAS_BY_ID_PATH)
            .query(&[("list", "true")]);
        let response = tracker.send(request).await?;

        match response.status() {
            // LIST on an empty collection is a 404
            StatusCode::NOT_FOUND => {
                tracker.record_not_found();
                Ok(BTreeMap::new())
            }
            status if status.is_success() => {
                let body: Option<VaultResponse<AliasListData>> =
                    tracker.decode_optional(response).await?;
                Ok(body.map(|b| b.data.into_aliases()).unwrap_or_default())
            }
            _ => Err(tracker
                .fail(response)
                .await
                .context("Failed to list entity aliases")),
        }
    }

    async fn read_alias_by_id(&self, id: &str) -> Result<Option<RemoteAlias>> {
        let tracker = OperationTracker::new("read_alias");
        let response = tracker
            .send(self.make_request(Method::GET, &format!("{ALIAS_BY_ID_PATH}/{id}")))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => {
                tracker.record_not_found();
                Ok(None)
            }
            status if status.is_success() => {
                let body: VaultResponse<AliasData> = tracker.decode(response).await?;
                Ok(Some(body.data.into()))
            }
            _ => Err(tracker
                .fail(response)
                .await
                .context(format!("Failed to read entity alias {id}"))),
        }
    }

    async fn delete_alias_by_id(&self, id: &str) -> Result<bool> {
        let tracker = OperationTracker::new("delete_alias");
        let response = tracker
            .send(self.make_request(Method::DELETE, &format!("{ALIAS_BY_ID_PATH}/{id}")))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracker.record_not_found();
                Ok(false)
            }
            status if status.is_success() => {
                tracker.record_success();
                Ok(true)
            }
            _ => Err(tracker
                .fail(response)
                .await
                .context(format!("Failed to delete entity alias {id}"))),
        }
    }
}
