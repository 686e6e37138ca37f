//! # Run Summary
//!
//! Outcome of every declared object plus the per-object failures of a run.

use crate::observability::metrics;
use std::fmt;
use tracing::error;

/// Kind of reconciled object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Entity,
    Alias,
}

impl ObjectKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Alias => "alias",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one declared object
///
/// Aliases written without an id end as [`Outcome::Upserted`]: Vault's alias
/// create endpoint updates an existing alias with the same name on the same
/// mount and answers both cases the same way, and the alias listing is only
/// taken after the writes. The outcome means "now present as declared" and
/// stands in for created-or-updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Absent remotely, now present
    Created,
    /// Present remotely, written in place
    Updated,
    /// Written with a create-or-update call whose prior state Vault does not
    /// report
    Upserted,
    /// Present remotely, now removed
    Deleted,
    /// Already in the declared state
    NoOp,
    /// A store call or reference resolution failed
    Failed,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Upserted => "upserted",
            Self::Deleted => "deleted",
            Self::NoOp => "noop",
            Self::Failed => "failed",
        }
    }
}

/// Outcome reported for a named object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReport {
    pub kind: ObjectKind,
    pub name: String,
    pub outcome: Outcome,
}

/// Per-object failure, reported and skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFailure {
    pub kind: ObjectKind,
    pub name: String,
    pub message: String,
}

/// Everything a run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub reports: Vec<ObjectReport>,
    pub failures: Vec<ObjectFailure>,
}

impl ReconcileSummary {
    /// Record the outcome of an object
    pub fn record(&mut self, kind: ObjectKind, name: &str, outcome: Outcome) {
        metrics::increment_objects(kind.as_str(), outcome.as_str());
        self.reports.push(ObjectReport {
            kind,
            name: name.to_string(),
            outcome,
        });
    }

    /// Log and record a per-object failure
    pub fn fail(&mut self, kind: ObjectKind, name: &str, err: &anyhow::Error) {
        error!("Failed to reconcile {} {}: {:#}", kind, name, err);
        self.record(kind, name, Outcome::Failed);
        self.failures.push(ObjectFailure {
            kind,
            name: name.to_string(),
            message: format!("{err:#}"),
        });
    }

    /// Forget earlier failures of an object that a later write fixed.
    /// Returns how many failures were dropped.
    pub fn clear_failures(&mut self, kind: ObjectKind, name: &str) -> usize {
        let before = self.failures.len();
        self.failures.retain(|f| !(f.kind == kind && f.name == name));
        self.reports
            .retain(|r| !(r.kind == kind && r.name == name && r.outcome == Outcome::Failed));
        before - self.failures.len()
    }

    /// Number of objects of `kind` that ended in `outcome`
    #[must_use]
    pub fn count(&self, kind: ObjectKind, outcome: Outcome) -> usize {
        self.reports
            .iter()
            .filter(|r| r.kind == kind && r.outcome == outcome)
            .count()
    }

    /// Last outcome recorded for a named object
    #[must_use]
    pub fn outcome_of(&self, kind: ObjectKind, name: &str) -> Option<Outcome> {
        self.reports
            .iter()
            .rev()
            .find(|r| r.kind == kind && r.name == name)
            .map(|r| r.outcome)
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in [ObjectKind::Entity, ObjectKind::Alias].into_iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(
                f,
                "{}: {} created, {} updated, {} upserted, {} deleted, {} unchanged, {} failed",
                kind,
                self.count(kind, Outcome::Created),
                self.count(kind, Outcome::Updated),
                self.count(kind, Outcome::Upserted),
                self.count(kind, Outcome::Deleted),
                self.count(kind, Outcome::NoOp),
                self.count(kind, Outcome::Failed),
            )?;
        }
        Ok(())
    }
}
