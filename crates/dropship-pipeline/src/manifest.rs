//! Manifest construction and persistence.
//!
//! # Design
//! - The manifest pass is read-only: every candidate is stability-gated,
//!   stat'ed, and fingerprinted, but never modified or moved.
//! - Per-file trouble is contained: a vanished file or exhausted retry
//!   budget counts that one file as failed and the batch continues.
//! - The artifact is written with create-new semantics so a same-second
//!   name collision surfaces as an explicit error instead of a silent
//!   overwrite.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

use chrono::Utc;
use dropship_config::Settings;
use dropship_events::{Event, EventBus};
use dropship_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::digest::fingerprint;
use crate::error::{PipelineError, PipelineResult};
use crate::scan::list_candidates;
use crate::stability::StabilityProbe;

/// Immutable per-file metadata record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    /// File name within the source directory.
    pub name: String,
    /// File size in bytes at record time.
    pub size: u64,
    /// Modification time as integer seconds since the Unix epoch.
    pub mtime: i64,
    /// Lowercase hex SHA-256 digest of the file content.
    pub sha256: String,
}

/// The manifest artifact persisted once per non-empty pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    /// Generation time as integer seconds since the Unix epoch.
    pub generated_at: i64,
    /// Source directory the entries were collected from.
    pub source_dir: String,
    /// Ordered per-file records.
    pub files: Vec<ManifestEntry>,
}

/// Aggregate result of a manifest-building pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSummary {
    /// Files recorded successfully.
    pub succeeded: u64,
    /// Files that vanished or exhausted their read attempts.
    pub failed: u64,
    /// The recorded entries, in candidate order.
    pub entries: Vec<ManifestEntry>,
}

/// Builds and persists the per-pass manifest.
#[derive(Clone)]
pub struct ManifestBuilder {
    source_dir: PathBuf,
    trigger_file: String,
    manifest_prefix: String,
    probe: StabilityProbe,
    attempts: u32,
    retry_delay: Duration,
    events: EventBus,
    metrics: Metrics,
}

impl ManifestBuilder {
    /// Construct a builder from the daemon settings.
    #[must_use]
    pub fn new(settings: &Settings, events: EventBus, metrics: Metrics) -> Self {
        Self {
            source_dir: settings.source_dir.clone(),
            trigger_file: settings.trigger_file.clone(),
            manifest_prefix: settings.manifest_prefix.clone(),
            probe: StabilityProbe::from_settings(&settings.stability),
            attempts: settings.retry.attempts,
            retry_delay: settings.retry.delay,
            events,
            metrics,
        }
    }

    /// Record every candidate file, aggregating successes and failures.
    ///
    /// Never fails for a single file's trouble; an unreadable source
    /// directory yields an empty summary.
    #[must_use]
    pub fn build(&self, pass_id: Uuid) -> ManifestSummary {
        let mut summary = ManifestSummary::default();
        for path in list_candidates(&self.source_dir, &self.trigger_file, &self.manifest_prefix) {
            if let Some(entry) = self.entry_for(pass_id, &path) {
                summary.succeeded += 1;
                summary.entries.push(entry);
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    /// Persist the manifest artifact into the source directory and return
    /// its path.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when the artifact cannot be serialised or
    /// written; the copy pass must not run without a persisted manifest.
    pub fn write(&self, pass_id: Uuid, entries: Vec<ManifestEntry>) -> PipelineResult<PathBuf> {
        fs::create_dir_all(&self.source_dir)
            .map_err(|source| PipelineError::io("manifest.create_dir", &self.source_dir, source))?;

        let generated_at = Utc::now().timestamp();
        let manifest = Manifest {
            generated_at,
            source_dir: self.source_dir.display().to_string(),
            files: entries,
        };
        let path = self
            .source_dir
            .join(format!("{}-{generated_at}.json", self.manifest_prefix));

        let payload = serde_json::to_vec_pretty(&manifest)
            .map_err(|source| PipelineError::json("manifest.serialize", &path, source))?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| PipelineError::io("manifest.create", &path, source))?;
        file.write_all(&payload)
            .map_err(|source| PipelineError::io("manifest.write", &path, source))?;

        let entry_count = u64::try_from(manifest.files.len()).unwrap_or(u64::MAX);
        self.metrics.record_manifest_entries(entry_count);
        let _ = self.events.publish(Event::ManifestWritten {
            pass_id,
            path: path.display().to_string(),
            entries: entry_count,
        });
        info!(path = %path.display(), entries = entry_count, "manifest persisted");

        Ok(path)
    }

    fn entry_for(&self, pass_id: Uuid, path: &Path) -> Option<ManifestEntry> {
        let name = file_name_of(path);

        for attempt in 1..=self.attempts {
            let outcome = self.probe.wait(path);
            self.metrics.record_stability_wait(outcome.as_str());
            if !outcome.is_stable() {
                warn!(
                    file = %path.display(),
                    outcome = outcome.as_str(),
                    "file not stable before manifest read"
                );
                let _ = self.events.publish(Event::FileVanished {
                    pass_id,
                    name: name.clone(),
                });
                return None;
            }
            if attempt == 1 {
                let _ = self.events.publish(Event::FileStable {
                    pass_id,
                    name: name.clone(),
                });
            }

            match self.read_entry(path, &name) {
                Ok(entry) => return Some(entry),
                Err(err) => {
                    error!(
                        file = %path.display(),
                        attempt,
                        error = ?err,
                        "manifest read failed"
                    );
                    if attempt < self.attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        None
    }

    fn read_entry(&self, path: &Path, name: &str) -> PipelineResult<ManifestEntry> {
        let metadata =
            fs::metadata(path).map_err(|source| PipelineError::io("manifest.stat", path, source))?;
        let mtime = metadata
            .modified()
            .map_err(|source| PipelineError::io("manifest.mtime", path, source))?
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX));
        let sha256 = fingerprint(path)?;

        Ok(ManifestEntry {
            name: name.to_string(),
            size: metadata.len(),
            mtime,
            sha256,
        })
    }
}

/// File name component rendered as an owned string.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropship_config::{RetrySettings, RunMode, ShareCredentials, StabilitySettings};
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    fn sample_settings(source_dir: &Path) -> Settings {
        Settings {
            source_dir: source_dir.to_path_buf(),
            destination: "/unused".to_string(),
            stability: StabilitySettings {
                threshold: Duration::ZERO,
                poll_interval: Duration::from_millis(5),
                max_wait: None,
            },
            retry: RetrySettings {
                attempts: 2,
                delay: Duration::from_millis(5),
            },
            trigger_file: "trigger.txt".to_string(),
            manifest_prefix: "manifest".to_string(),
            run_mode: RunMode::Cron,
            share: ShareCredentials::default(),
            share_mount: None,
        }
    }

    fn builder(source_dir: &Path) -> ManifestBuilder {
        ManifestBuilder::new(
            &sample_settings(source_dir),
            EventBus::new(),
            Metrics::new().expect("metrics registry"),
        )
    }

    #[test]
    fn records_every_stable_candidate() -> TestResult<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("alpha.dat"), b"alpha payload")?;
        fs::write(dir.path().join("beta.dat"), b"beta")?;
        fs::write(dir.path().join("trigger.txt"), b"")?;

        let pass_id = Uuid::new_v4();
        let summary = builder(dir.path()).build(pass_id);

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.entries.len(), 2);

        let alpha = &summary.entries[0];
        assert_eq!(alpha.name, "alpha.dat");
        assert_eq!(alpha.size, 13);
        assert_eq!(alpha.sha256, fingerprint(&dir.path().join("alpha.dat"))?);
        assert!(alpha.mtime > 0);
        Ok(())
    }

    #[test]
    fn vanishing_candidate_counts_as_failed() -> TestResult<()> {
        let dir = TempDir::new()?;
        let doomed = dir.path().join("doomed.dat");
        fs::write(&doomed, b"short lived")?;

        let mut settings = sample_settings(dir.path());
        settings.stability.threshold = Duration::from_millis(200);
        let builder = ManifestBuilder::new(
            &settings,
            EventBus::new(),
            Metrics::new().expect("metrics registry"),
        );

        let deleter = {
            let doomed = doomed.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                let _ = fs::remove_file(&doomed);
            })
        };

        let summary = builder.build(Uuid::new_v4());
        deleter.join().expect("deleter thread");

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 1);
        assert!(summary.entries.is_empty());
        Ok(())
    }

    #[test]
    fn written_artifact_round_trips() -> TestResult<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("alpha.dat"), b"alpha payload")?;

        let builder = builder(dir.path());
        let pass_id = Uuid::new_v4();
        let summary = builder.build(pass_id);
        let path = builder.write(pass_id, summary.entries.clone())?;

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("artifact name");
        assert!(name.starts_with("manifest-") && name.ends_with(".json"));

        let parsed: Manifest = serde_json::from_slice(&fs::read(&path)?)?;
        assert_eq!(parsed.files, summary.entries);
        assert_eq!(parsed.source_dir, dir.path().display().to_string());
        assert!(parsed.generated_at > 0);
        Ok(())
    }

    #[test]
    fn empty_directory_builds_an_empty_summary() {
        let dir = TempDir::new().expect("tempdir");
        let summary = builder(dir.path()).build(Uuid::new_v4());
        assert_eq!(summary, ManifestSummary::default());
    }
}
