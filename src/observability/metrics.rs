//! # Metrics
//!
//! Prometheus metrics for a mapper run.
//!
//! ## Metrics Exposed
//!
//! - `vault_entity_mapper_runs_total` - Total number of reconciliation runs
//! - `vault_entity_mapper_run_errors_total` - Runs aborted by a fatal error
//! - `vault_entity_mapper_run_duration_seconds` - Duration of a reconciliation run
//! - `vault_entity_mapper_store_operations_total` - Vault calls by operation and result
//! - `vault_entity_mapper_store_operation_duration_seconds` - Duration of Vault calls
//! - `vault_entity_mapper_objects_total` - Reconciled objects by kind and outcome
//! - `vault_entity_mapper_last_run_timestamp_seconds` - Unix time the last run finished
//!
//! A batch run has no scrape endpoint; the registry is written to a file for
//! the node-exporter textfile collector instead (see [`write_textfile`]).

use anyhow::{Context, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::path::Path;
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RUNS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_entity_mapper_runs_total",
        "Total number of reconciliation runs",
    )
    .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_entity_mapper_run_errors_total",
        "Total number of runs aborted by a configuration or setup error",
    )
    .expect("Failed to create RUN_ERRORS_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "vault_entity_mapper_run_duration_seconds",
            "Duration of a reconciliation run in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static STORE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_entity_mapper_store_operations_total",
            "Total number of Vault identity store operations",
        ),
        &["operation", "result"],
    )
    .expect("Failed to create STORE_OPERATIONS_TOTAL metric - this should never happen")
});

static STORE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vault_entity_mapper_store_operation_duration_seconds",
            "Duration of Vault identity store operations in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION metric - this should never happen")
});

static OBJECTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_entity_mapper_objects_total",
            "Total number of reconciled objects by kind and outcome",
        ),
        &["kind", "outcome"],
    )
    .expect("Failed to create OBJECTS_TOTAL metric - this should never happen")
});

static LAST_RUN_TIMESTAMP: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "vault_entity_mapper_last_run_timestamp_seconds",
        "Unix timestamp of the last finished run",
    )
    .expect("Failed to create LAST_RUN_TIMESTAMP metric - this should never happen")
});

/// Register all metrics with the crate registry. Call once at startup.
///
/// # Errors
/// Returns an error if a metric is registered twice
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_DURATION.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(OBJECTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LAST_RUN_TIMESTAMP.clone()))?;

    Ok(())
}

pub fn increment_runs() {
    RUNS_TOTAL.inc();
}

pub fn increment_run_errors() {
    RUN_ERRORS_TOTAL.inc();
}

pub fn observe_run_duration(duration: f64) {
    RUN_DURATION.observe(duration);
}

pub fn record_store_operation(operation: &str, result: &str, duration: f64) {
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
    STORE_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_objects(kind: &str, outcome: &str) {
    OBJECTS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn set_last_run_timestamp() {
    LAST_RUN_TIMESTAMP.set(chrono::Utc::now().timestamp());
}

/// Render the registry in the Prometheus text exposition format
///
/// # Errors
/// Returns an error if encoding fails
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;

    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}

/// Write the registry to `path` for the node-exporter textfile collector.
/// Written to a sibling temp file and renamed so the collector never reads a
/// partial file.
///
/// # Errors
/// Returns an error if the file cannot be written
pub fn write_textfile(path: &Path) -> Result<()> {
    let text = gather_text()?;
    let tmp_path = path.with_extension("prom.tmp");

    std::fs::write(&tmp_path, text)
        .with_context(|| format!("Failed to write metrics to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move metrics file into {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_metrics_are_rendered() {
        // Registration is process-wide, so only this test registers.
        register_metrics().unwrap();
        increment_runs();
        record_store_operation("lookup_entity", "success", 0.02);
        increment_objects("entity", "created");
        set_last_run_timestamp();

        let text = gather_text().unwrap();
        assert!(text.contains("vault_entity_mapper_runs_total"));
        assert!(text.contains(r#"operation="lookup_entity",result="success""#));
        assert!(text.contains(r#"kind="entity",outcome="created""#));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault_entity_mapper.prom");
        write_textfile(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("vault_entity_mapper_last_run_timestamp_seconds"));
    }
}
