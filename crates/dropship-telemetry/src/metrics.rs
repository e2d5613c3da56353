//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters relevant to manifest and transfer passes.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    passes_total: IntCounter,
    manifest_entries_total: IntCounter,
    files_copied_total: IntCounter,
    files_failed_total: IntCounter,
    bytes_copied_total: IntCounter,
    copy_attempts_total: IntCounterVec,
    stability_waits_total: IntCounterVec,
}

/// Snapshot of the ingestion counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total manifest-plus-copy passes executed.
    pub passes_total: u64,
    /// Total manifest entries recorded across passes.
    pub manifest_entries_total: u64,
    /// Total files copied to the destination and removed from the source.
    pub files_copied_total: u64,
    /// Total files that exhausted their transfer attempts.
    pub files_failed_total: u64,
    /// Total bytes written to the destination.
    pub bytes_copied_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built
    /// or registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let passes_total = build_counter(
            "dropship_passes_total",
            "Manifest-plus-copy passes executed",
        )?;
        let manifest_entries_total = build_counter(
            "dropship_manifest_entries_total",
            "Manifest entries recorded",
        )?;
        let files_copied_total = build_counter(
            "dropship_files_copied_total",
            "Files copied to the destination",
        )?;
        let files_failed_total = build_counter(
            "dropship_files_failed_total",
            "Files that exhausted their transfer attempts",
        )?;
        let bytes_copied_total = build_counter(
            "dropship_bytes_copied_total",
            "Bytes written to the destination",
        )?;
        let copy_attempts_total = IntCounterVec::new(
            Opts::new(
                "dropship_copy_attempts_total",
                "Per-file transfer attempts by outcome",
            ),
            &["outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "dropship_copy_attempts_total",
            source,
        })?;
        let stability_waits_total = IntCounterVec::new(
            Opts::new(
                "dropship_stability_waits_total",
                "Stability probe outcomes by kind",
            ),
            &["outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "dropship_stability_waits_total",
            source,
        })?;

        register(&registry, "dropship_passes_total", passes_total.clone())?;
        register(
            &registry,
            "dropship_manifest_entries_total",
            manifest_entries_total.clone(),
        )?;
        register(
            &registry,
            "dropship_files_copied_total",
            files_copied_total.clone(),
        )?;
        register(
            &registry,
            "dropship_files_failed_total",
            files_failed_total.clone(),
        )?;
        register(
            &registry,
            "dropship_bytes_copied_total",
            bytes_copied_total.clone(),
        )?;
        register(
            &registry,
            "dropship_copy_attempts_total",
            copy_attempts_total.clone(),
        )?;
        register(
            &registry,
            "dropship_stability_waits_total",
            stability_waits_total.clone(),
        )?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                passes_total,
                manifest_entries_total,
                files_copied_total,
                files_failed_total,
                bytes_copied_total,
                copy_attempts_total,
                stability_waits_total,
            }),
        })
    }

    /// Record a completed manifest-plus-copy pass.
    pub fn record_pass(&self) {
        self.inner.passes_total.inc();
    }

    /// Record manifest entries persisted during a pass.
    pub fn record_manifest_entries(&self, entries: u64) {
        self.inner.manifest_entries_total.inc_by(entries);
    }

    /// Record a file copied to the destination, with the bytes written.
    pub fn record_file_copied(&self, bytes: u64) {
        self.inner.files_copied_total.inc();
        self.inner.bytes_copied_total.inc_by(bytes);
    }

    /// Record a file that exhausted its transfer attempts.
    pub fn record_file_failed(&self) {
        self.inner.files_failed_total.inc();
    }

    /// Record a single transfer attempt by outcome label.
    pub fn record_copy_attempt(&self, outcome: &str) {
        self.inner
            .copy_attempts_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a stability probe outcome by label.
    pub fn record_stability_wait(&self, outcome: &str) {
        self.inner
            .stability_waits_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Snapshot the ingestion counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            passes_total: self.inner.passes_total.get(),
            manifest_entries_total: self.inner.manifest_entries_total.get(),
            files_copied_total: self.inner.files_copied_total.get(),
            files_failed_total: self.inner.files_failed_total.get(),
            bytes_copied_total: self.inner.bytes_copied_total.get(),
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not valid UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }
}

fn build_counter(name: &'static str, help: &str) -> TelemetryResult<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> TelemetryResult<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_snapshot() {
        let metrics = Metrics::new().expect("metrics registry");

        metrics.record_pass();
        metrics.record_manifest_entries(3);
        metrics.record_file_copied(1_024);
        metrics.record_file_copied(2_048);
        metrics.record_file_failed();
        metrics.record_copy_attempt("success");
        metrics.record_stability_wait("stable");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.passes_total, 1);
        assert_eq!(snapshot.manifest_entries_total, 3);
        assert_eq!(snapshot.files_copied_total, 2);
        assert_eq!(snapshot.files_failed_total, 1);
        assert_eq!(snapshot.bytes_copied_total, 3_072);
    }

    #[test]
    fn render_emits_text_format() {
        let metrics = Metrics::new().expect("metrics registry");
        metrics.record_pass();

        let rendered = metrics.render().expect("rendered metrics");
        assert!(rendered.contains("dropship_passes_total"));
    }
}
