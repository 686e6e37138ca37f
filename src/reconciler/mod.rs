//! # Reconciler
//!
//! Converges Vault's identity store onto the mapping document in one pass.
//!
//! ## Reconciliation Flow
//!
//! 1. Validate the document (no store calls before this succeeds)
//! 2. Create/update entities, caching `name → id` as they resolve
//! 3. Resolve auth backend names to mount accessors (only if aliases are declared)
//! 4. Create/update aliases, then list remote aliases and delete deactivated ones
//! 5. Delete deactivated entities in one batch call
//!
//! Store calls are issued strictly one after another. Per-object failures are
//! logged, recorded in the [`ReconcileSummary`] and skipped; only invalid
//! configuration and a failed auth-method listing abort the run. Re-running
//! against partially applied state converges to the same result.

pub mod aliases;
pub mod auth_methods;
pub mod cache;
pub mod entities;
pub mod summary;
pub mod validation;

pub use aliases::AliasReconciler;
pub use auth_methods::AuthMethods;
pub use cache::LookupCache;
pub use entities::{EntityReconciler, PendingDeletions};
pub use summary::{ObjectFailure, ObjectKind, ObjectReport, Outcome, ReconcileSummary};
pub use validation::validate_config;

use crate::config::MapperConfig;
use crate::error::ReconcileError;
use crate::identity::IdentityStore;
use crate::observability::metrics;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// Single-run reconciliation against one identity store
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    store: &'a dyn IdentityStore,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(store: &'a dyn IdentityStore) -> Self {
        Self { store }
    }

    /// Reconcile the store against `config`
    ///
    /// # Errors
    /// Returns an error for invalid configuration or when enabled auth methods
    /// cannot be listed. Per-object failures are reported in the summary.
    pub async fn run(&self, config: &MapperConfig) -> Result<ReconcileSummary, ReconcileError> {
        let span = info_span!(
            "reconcile",
            entities = config.entities.len(),
            aliases = config.entity_aliases.len()
        );
        let start = Instant::now();
        metrics::increment_runs();

        let result = self.run_inner(config).instrument(span).await;

        metrics::observe_run_duration(start.elapsed().as_secs_f64());
        metrics::set_last_run_timestamp();
        if result.is_err() {
            metrics::increment_run_errors();
        }
        result
    }

    async fn run_inner(&self, config: &MapperConfig) -> Result<ReconcileSummary, ReconcileError> {
        validate_config(config)?;

        let mut cache = LookupCache::default();
        let mut summary = ReconcileSummary::default();

        let entities = EntityReconciler::new(self.store);
        let pending = entities
            .reconcile(&config.entities, &mut cache, &mut summary)
            .await;

        if config.entity_aliases.is_empty() {
            info!("No entity aliases declared, skipping auth method lookup");
        } else {
            let auth_methods = AuthMethods::resolve(self.store)
                .await
                .map_err(ReconcileError::AuthMethods)?;

            AliasReconciler::new(self.store, &auth_methods)
                .with_deactivated_entities(
                    config
                        .entities
                        .iter()
                        .filter(|e| e.deactivated)
                        .map(|e| e.name.as_str()),
                )
                .reconcile(&config.entity_aliases, &mut cache, &mut summary)
                .await;
        }

        entities.delete_pending(&pending, &mut summary).await;

        info!("Reconciliation finished: {}", summary);
        Ok(summary)
    }
}
