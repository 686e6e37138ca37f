//! # Entity Reconciler
//!
//! Creates and updates declared entities in configuration order, filling the
//! [`LookupCache`] as names resolve. Deactivated entities are only collected
//! here; they are deleted in one batch call once every alias has been
//! reconciled, so alias resolution still sees them during the run.

use super::cache::LookupCache;
use super::summary::{ObjectKind, Outcome, ReconcileSummary};
use crate::config::EntityConfig;
use crate::identity::{EntityUpsert, IdentityStore, RemoteEntity};
use tracing::{debug, info, warn};

/// Entities found remotely but declared deactivated
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingDeletions {
    /// (entity name, entity id), unique by id
    entries: Vec<(String, String)>,
}

impl PendingDeletions {
    fn push(&mut self, name: &str, id: &str) {
        if self.entries.iter().any(|(_, existing)| existing == id) {
            return;
        }
        self.entries.push((name.to_string(), id.to_string()));
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|(_, id)| id.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntityReconciler<'a> {
    store: &'a dyn IdentityStore,
}

impl<'a> EntityReconciler<'a> {
    #[must_use]
    pub fn new(store: &'a dyn IdentityStore) -> Self {
        Self { store }
    }

    /// Create/update pass over all declared entities.
    /// Returns the deletions to flush with [`Self::delete_pending`].
    pub async fn reconcile(
        &self,
        entities: &[EntityConfig],
        cache: &mut LookupCache,
        summary: &mut ReconcileSummary,
    ) -> PendingDeletions {
        let mut pending = PendingDeletions::default();
        for entity in entities {
            self.reconcile_one(entity, cache, &mut pending, summary)
                .await;
        }
        pending
    }

    async fn reconcile_one(
        &self,
        entity: &EntityConfig,
        cache: &mut LookupCache,
        pending: &mut PendingDeletions,
        summary: &mut ReconcileSummary,
    ) {
        let remote = match self.store.lookup_entity_by_name(&entity.name).await {
            Ok(remote) => remote,
            Err(e) => {
                summary.fail(ObjectKind::Entity, &entity.name, &e);
                return;
            }
        };

        if let Some(remote) = &remote {
            if cache.insert_if_absent(&entity.name, &remote.id) {
                debug!("Resolved entity {} to {}", entity.name, remote.id);
            }
        }

        if entity.deactivated {
            match remote {
                Some(remote) => pending.push(&entity.name, &remote.id),
                None => {
                    debug!("Entity {} is deactivated and absent, nothing to do", entity.name);
                    summary.record(ObjectKind::Entity, &entity.name, Outcome::NoOp);
                }
            }
            return;
        }

        if let Some(declared_id) = entity.id.as_deref() {
            check_declared_id(&entity.name, declared_id, remote.as_ref());
        }

        if let Some(remote) = &remote {
            if matches_declared(remote, entity) {
                debug!("Entity {} unchanged, skipping update", entity.name);
                summary.record(ObjectKind::Entity, &entity.name, Outcome::NoOp);
                return;
            }
        }

        // Vault treats a write with an id as an update of that entity, so only
        // an id it reported itself is sent
        let request = EntityUpsert {
            id: remote.as_ref().map(|r| r.id.clone()),
            name: entity.name.clone(),
            metadata: entity.metadata.clone(),
            policies: entity.policies.clone(),
            disabled: entity.disabled,
        };

        match self.store.upsert_entity(&request).await {
            Ok(id) => {
                cache.insert_if_absent(&entity.name, &id);
                let outcome = if remote.is_some() {
                    Outcome::Updated
                } else {
                    Outcome::Created
                };
                info!("Entity {} was {} ({})", entity.name, outcome.as_str(), id);
                summary.record(ObjectKind::Entity, &entity.name, outcome);
            }
            Err(e) => summary.fail(ObjectKind::Entity, &entity.name, &e),
        }
    }

    /// Delete every collected entity with a single batch call
    pub async fn delete_pending(&self, pending: &PendingDeletions, summary: &mut ReconcileSummary) {
        if pending.is_empty() {
            return;
        }

        for (name, id) in &pending.entries {
            warn!("Entity {} ({}) is deactivated in config, deleting", name, id);
        }

        match self.store.batch_delete_entities(&pending.ids()).await {
            Ok(()) => {
                info!("Deleted {} deactivated entities", pending.len());
                for (name, _) in &pending.entries {
                    summary.record(ObjectKind::Entity, name, Outcome::Deleted);
                }
            }
            Err(e) => {
                for (name, _) in &pending.entries {
                    summary.fail(ObjectKind::Entity, name, &e);
                }
            }
        }
    }
}

/// Vault assigns entity ids; a declared id is only compared with Vault's
fn check_declared_id(name: &str, declared_id: &str, remote: Option<&RemoteEntity>) {
    match remote {
        Some(remote) if remote.id != declared_id => warn!(
            "Entity {} has id {} in Vault, not the declared {}; keeping Vault's id",
            name, remote.id, declared_id
        ),
        Some(_) => {}
        None => warn!(
            "Entity {} does not exist yet; Vault assigns its id, the declared id {} is not used",
            name, declared_id
        ),
    }
}

/// Remote entity already carries the declared attributes
fn matches_declared(remote: &RemoteEntity, declared: &EntityConfig) -> bool {
    remote.metadata == declared.metadata
        && remote.policies == declared.policies
        && remote.disabled == declared.disabled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_deletions_unique_by_id() {
        let mut pending = PendingDeletions::default();
        pending.push("bot1", "id-1");
        pending.push("bot1", "id-1");
        pending.push("bot2", "id-2");
        assert_eq!(pending.ids(), vec!["id-1", "id-2"]);
    }

    #[test]
    fn test_matches_declared() {
        let declared = EntityConfig {
            name: "bot1".to_string(),
            metadata: [("team".to_string(), "infra".to_string())].into(),
            policies: vec!["read".to_string()],
            ..Default::default()
        };
        let mut remote = RemoteEntity {
            id: "id-1".to_string(),
            name: "bot1".to_string(),
            metadata: declared.metadata.clone(),
            policies: vec!["read".to_string()],
            disabled: false,
        };
        assert!(matches_declared(&remote, &declared));

        remote.policies.push("write".to_string());
        assert!(!matches_declared(&remote, &declared));

        remote.policies.pop();
        remote.disabled = true;
        assert!(!matches_declared(&remote, &declared));
    }
}
