//! # Alias Reconciler
//!
//! Two passes over the declared aliases:
//!
//! 1. **Create/update**: resolve each active alias's canonical entity id and
//!    mount accessor, then upsert it.
//! 2. **Deletions**: list every remote alias once (after pass 1, so the
//!    listing already contains this run's writes), index it by name, delete
//!    remote aliases declared deactivated and give active aliases missing from
//!    the listing a second create. An alias listed on the right mount but
//!    bound to another entity is rewritten by the id Vault listed.
//!
//! Alias ids are assigned by Vault. A declared `id` is only compared with the
//! listing, never sent.
//!
//! Every delete is preceded by a read of the same id; an alias that is already
//! gone counts as deleted.

use super::auth_methods::AuthMethods;
use super::cache::LookupCache;
use super::summary::{ObjectKind, Outcome, ReconcileSummary};
use crate::config::{BackendRef, EntityAliasConfig, EntityRef};
use crate::identity::{AliasUpsert, IdentityStore, RemoteAlias};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why an alias's references could not be turned into ids
#[derive(Debug, Error)]
enum ResolveError {
    #[error("entity {0} does not exist")]
    EntityNotFound(String),

    #[error("failed to look up entity {name}")]
    EntityLookup {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("auth backend {0} is not enabled")]
    UnknownBackend(String),

    #[error("alias has no usable entity or auth backend reference")]
    MissingReference,
}

/// Ids an active alias is written with
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedAlias {
    canonical_id: String,
    mount_accessor: String,
}

/// Remote alias in the name-indexed view
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedAlias {
    id: String,
    canonical_id: String,
    mount_accessor: String,
    deactivated: bool,
}

/// Remote aliases indexed by name. One name may exist on several mounts.
#[derive(Debug, Default)]
struct AliasIndex {
    by_name: BTreeMap<String, Vec<IndexedAlias>>,
}

impl AliasIndex {
    fn from_listing(listing: BTreeMap<String, RemoteAlias>) -> Self {
        let mut by_name: BTreeMap<String, Vec<IndexedAlias>> = BTreeMap::new();
        for (id, alias) in listing {
            by_name.entry(alias.name).or_default().push(IndexedAlias {
                id,
                canonical_id: alias.canonical_id,
                mount_accessor: alias.mount_accessor,
                deactivated: false,
            });
        }
        Self { by_name }
    }

    fn find(&self, name: &str, mount_accessor: &str) -> Option<&IndexedAlias> {
        self.by_name
            .get(name)?
            .iter()
            .find(|e| e.mount_accessor == mount_accessor)
    }

    /// Flag remote aliases called `name` (on `mount_accessor` when given).
    /// Returns how many were flagged.
    fn mark_deactivated(&mut self, name: &str, mount_accessor: Option<&str>) -> usize {
        let Some(entries) = self.by_name.get_mut(name) else {
            return 0;
        };
        let mut marked = 0;
        for entry in entries
            .iter_mut()
            .filter(|e| mount_accessor.is_none_or(|accessor| e.mount_accessor == accessor))
        {
            entry.deactivated = true;
            marked += 1;
        }
        marked
    }

    fn deactivated(&self) -> impl Iterator<Item = (&str, &IndexedAlias)> {
        self.by_name.iter().flat_map(|(name, entries)| {
            entries
                .iter()
                .filter(|e| e.deactivated)
                .map(move |e| (name.as_str(), e))
        })
    }
}

/// How a deactivated alias narrows which remote aliases it matches
enum DeactivationScope {
    /// Any mount
    AnyMount,
    OnMount(String),
    /// Declared backend is not enabled, so nothing can match
    Nothing,
}

#[derive(Debug)]
pub struct AliasReconciler<'a> {
    store: &'a dyn IdentityStore,
    auth_methods: &'a AuthMethods,
    deactivated_entities: HashSet<&'a str>,
}

impl<'a> AliasReconciler<'a> {
    #[must_use]
    pub fn new(store: &'a dyn IdentityStore, auth_methods: &'a AuthMethods) -> Self {
        Self {
            store,
            auth_methods,
            deactivated_entities: HashSet::new(),
        }
    }

    /// Entity names declared deactivated in the same run, used to warn about
    /// aliases that point at them
    #[must_use]
    pub fn with_deactivated_entities(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.deactivated_entities = names.into_iter().collect();
        self
    }

    /// Run both passes
    pub async fn reconcile(
        &self,
        aliases: &[EntityAliasConfig],
        cache: &mut LookupCache,
        summary: &mut ReconcileSummary,
    ) {
        let resolved = self.create_pass(aliases, cache, summary).await;
        self.deletion_pass(aliases, &resolved, summary).await;
    }

    /// Pass 1. Returns the resolution of every active alias; `None` marks an
    /// alias whose references could not be resolved.
    async fn create_pass(
        &self,
        aliases: &[EntityAliasConfig],
        cache: &mut LookupCache,
        summary: &mut ReconcileSummary,
    ) -> HashMap<String, Option<ResolvedAlias>> {
        let mut resolved = HashMap::new();

        for alias in aliases.iter().filter(|a| !a.deactivated) {
            match self.resolve(alias, cache).await {
                Ok(target) => {
                    self.upsert(alias, &target, None, summary).await;
                    resolved.insert(alias.name.clone(), Some(target));
                }
                Err(e) => {
                    summary.fail(ObjectKind::Alias, &alias.name, &anyhow::Error::new(e));
                    resolved.insert(alias.name.clone(), None);
                }
            }
        }

        resolved
    }

    /// Pass 2
    async fn deletion_pass(
        &self,
        aliases: &[EntityAliasConfig],
        resolved: &HashMap<String, Option<ResolvedAlias>>,
        summary: &mut ReconcileSummary,
    ) {
        let listing = match self.store.list_aliases_by_id().await {
            Ok(listing) => listing,
            Err(e) => {
                error!("Failed to list entity aliases, skipping alias deletions: {:#}", e);
                for alias in aliases.iter().filter(|a| a.deactivated) {
                    summary.fail(ObjectKind::Alias, &alias.name, &e);
                }
                return;
            }
        };
        debug!("Vault reports {} entity aliases", listing.len());

        let mut index = AliasIndex::from_listing(listing);

        for alias in aliases {
            if alias.deactivated {
                let marked = match self.deactivation_scope(alias) {
                    DeactivationScope::AnyMount => index.mark_deactivated(&alias.name, None),
                    DeactivationScope::OnMount(accessor) => {
                        index.mark_deactivated(&alias.name, Some(&accessor))
                    }
                    DeactivationScope::Nothing => 0,
                };
                if marked == 0 {
                    debug!("Entity alias {} is deactivated and absent, nothing to do", alias.name);
                    summary.record(ObjectKind::Alias, &alias.name, Outcome::NoOp);
                }
                continue;
            }

            // Unresolvable aliases were already reported by the create pass
            let Some(Some(target)) = resolved.get(&alias.name) else {
                continue;
            };
            let listed = index.find(&alias.name, &target.mount_accessor);
            if let Some(declared_id) = alias.id.as_deref() {
                check_declared_id(&alias.name, declared_id, listed);
            }

            let rewrite_id = match listed {
                None => {
                    warn!(
                        "Entity alias {} is missing from the alias listing, writing it again",
                        alias.name
                    );
                    None
                }
                Some(listed) if listed.canonical_id != target.canonical_id => {
                    warn!(
                        "Entity alias {} ({}) is bound to entity {} instead of {}, updating it",
                        alias.name, listed.id, listed.canonical_id, target.canonical_id
                    );
                    Some(listed.id.clone())
                }
                Some(_) => {
                    // A write reported as failed may still have been applied
                    if summary.clear_failures(ObjectKind::Alias, &alias.name) > 0 {
                        debug!("Entity alias {} is listed as declared", alias.name);
                        summary.record(ObjectKind::Alias, &alias.name, Outcome::NoOp);
                    }
                    continue;
                }
            };

            if self
                .upsert(alias, target, rewrite_id.as_deref(), summary)
                .await
            {
                summary.clear_failures(ObjectKind::Alias, &alias.name);
            }
        }

        for (name, entry) in index.deactivated() {
            self.delete_verified(name, entry, summary).await;
        }
    }

    async fn resolve(
        &self,
        alias: &EntityAliasConfig,
        cache: &mut LookupCache,
    ) -> Result<ResolvedAlias, ResolveError> {
        let canonical_id = match alias.entity_ref() {
            Some(EntityRef::CanonicalId(id)) => id.to_string(),
            Some(EntityRef::EntityName(name)) => self.resolve_entity(name, cache).await?,
            None => return Err(ResolveError::MissingReference),
        };

        let mount_accessor = match alias.backend_ref() {
            Some(BackendRef::MountAccessor(accessor)) => accessor.to_string(),
            Some(BackendRef::AuthBackend(backend)) => self
                .auth_methods
                .accessor_for(backend)
                .ok_or_else(|| ResolveError::UnknownBackend(backend.to_string()))?
                .to_string(),
            None => return Err(ResolveError::MissingReference),
        };

        Ok(ResolvedAlias {
            canonical_id,
            mount_accessor,
        })
    }

    /// Canonical id for an entity name: cache first, then the store
    async fn resolve_entity(
        &self,
        name: &str,
        cache: &mut LookupCache,
    ) -> Result<String, ResolveError> {
        if self.deactivated_entities.contains(name) {
            warn!(
                "An alias references entity {} which is deactivated; Vault removes the alias with the entity",
                name
            );
        }

        if let Some(id) = cache.get(name) {
            debug!("Entity {} resolved from cache", name);
            return Ok(id.to_string());
        }

        match self.store.lookup_entity_by_name(name).await {
            Ok(Some(entity)) => {
                cache.insert_if_absent(name, &entity.id);
                Ok(entity.id)
            }
            Ok(None) => Err(ResolveError::EntityNotFound(name.to_string())),
            Err(source) => Err(ResolveError::EntityLookup {
                name: name.to_string(),
                source,
            }),
        }
    }

    fn deactivation_scope(&self, alias: &EntityAliasConfig) -> DeactivationScope {
        match alias.backend_ref() {
            Some(BackendRef::MountAccessor(accessor)) => {
                DeactivationScope::OnMount(accessor.to_string())
            }
            Some(BackendRef::AuthBackend(backend)) => match self.auth_methods.accessor_for(backend)
            {
                Some(accessor) => DeactivationScope::OnMount(accessor.to_string()),
                None => DeactivationScope::Nothing,
            },
            None => DeactivationScope::AnyMount,
        }
    }

    /// Write the alias; `id` (from the listing) turns the write into an
    /// update of that alias. Returns whether the write succeeded.
    async fn upsert(
        &self,
        alias: &EntityAliasConfig,
        target: &ResolvedAlias,
        id: Option<&str>,
        summary: &mut ReconcileSummary,
    ) -> bool {
        let request = AliasUpsert {
            id: id.map(ToString::to_string),
            name: alias.name.clone(),
            canonical_id: target.canonical_id.clone(),
            mount_accessor: target.mount_accessor.clone(),
        };

        match self.store.upsert_alias(&request).await {
            Ok(written) => {
                let outcome = if id.is_some() {
                    Outcome::Updated
                } else {
                    Outcome::Upserted
                };
                info!(
                    "Entity alias {} was written ({} -> entity {})",
                    alias.name, written, target.canonical_id
                );
                summary.record(ObjectKind::Alias, &alias.name, outcome);
                true
            }
            Err(e) => {
                summary.fail(ObjectKind::Alias, &alias.name, &e);
                false
            }
        }
    }

    async fn delete_verified(&self, name: &str, entry: &IndexedAlias, summary: &mut ReconcileSummary) {
        match self.store.read_alias_by_id(&entry.id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!("Entity alias {} ({}) is already gone", name, entry.id);
                summary.record(ObjectKind::Alias, name, Outcome::NoOp);
                return;
            }
            Err(e) => {
                summary.fail(ObjectKind::Alias, name, &e);
                return;
            }
        }

        warn!("Entity alias {} ({}) is deactivated in config, deleting", name, entry.id);
        match self.store.delete_alias_by_id(&entry.id).await {
            Ok(true) => summary.record(ObjectKind::Alias, name, Outcome::Deleted),
            Ok(false) => summary.record(ObjectKind::Alias, name, Outcome::NoOp),
            Err(e) => summary.fail(ObjectKind::Alias, name, &e),
        }
    }
}

/// Vault assigns alias ids; a declared id is only compared with the listing
fn check_declared_id(name: &str, declared_id: &str, listed: Option<&IndexedAlias>) {
    match listed {
        Some(listed) if listed.id != declared_id => warn!(
            "Entity alias {} has id {} in Vault, not the declared {}; keeping Vault's id",
            name, listed.id, declared_id
        ),
        Some(_) => {}
        None => warn!(
            "Entity alias {} is not listed yet; Vault assigns its id, the declared id {} is not used",
            name, declared_id
        ),
    }
}
