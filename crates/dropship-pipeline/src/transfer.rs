//! Hashed copy engine: stability wait, fingerprint, write, delete source.
//!
//! # Design
//! - The per-file commit order is fixed: hash, write to the destination,
//!   then delete the source. The source is removed only after the write
//!   returned without error, so a crash never loses the only copy.
//! - Each file gets a bounded attempt budget with a fixed backoff delay; an
//!   exhausted budget leaves the source untouched for the next pass.
//! - No error crosses the pass boundary; failures surface as aggregate
//!   counts, events, and log entries.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use dropship_config::Settings;
use dropship_events::{Event, EventBus};
use dropship_telemetry::Metrics;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dest::DestinationWriter;
use crate::digest::fingerprint;
use crate::error::{PipelineError, PipelineResult};
use crate::manifest::file_name_of;
use crate::scan::list_candidates;
use crate::stability::StabilityProbe;

/// Aggregate result of a copy pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Candidate files enumerated this pass.
    pub found: u64,
    /// Files copied to the destination and removed from the source.
    pub copied: u64,
    /// Files that exhausted their attempt budget.
    pub failed: u64,
}

/// Transfers candidate files to the destination with retry and cleanup.
#[derive(Clone)]
pub struct CopyEngine {
    source_dir: PathBuf,
    trigger_file: String,
    manifest_prefix: String,
    probe: StabilityProbe,
    attempts: u32,
    retry_delay: Duration,
    writer: DestinationWriter,
    events: EventBus,
    metrics: Metrics,
}

impl CopyEngine {
    /// Construct an engine from the daemon settings and a classified
    /// destination writer.
    #[must_use]
    pub fn new(
        settings: &Settings,
        writer: DestinationWriter,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            source_dir: settings.source_dir.clone(),
            trigger_file: settings.trigger_file.clone(),
            manifest_prefix: settings.manifest_prefix.clone(),
            probe: StabilityProbe::from_settings(&settings.stability),
            attempts: settings.retry.attempts,
            retry_delay: settings.retry.delay,
            writer,
            events,
            metrics,
        }
    }

    /// Copy every candidate file, enumerated fresh from the source
    /// directory.
    ///
    /// A failed file is left untouched in the source directory for the next
    /// pass to retry.
    #[must_use]
    pub fn copy_all(&self, pass_id: Uuid) -> CopyOutcome {
        let mut outcome = CopyOutcome::default();
        for src in list_candidates(&self.source_dir, &self.trigger_file, &self.manifest_prefix) {
            outcome.found += 1;
            let name = file_name_of(&src);
            if self.copy_file(pass_id, &src, &name) {
                outcome.copied += 1;
            } else {
                outcome.failed += 1;
                self.metrics.record_file_failed();
            }
        }
        outcome
    }

    fn copy_file(&self, pass_id: Uuid, src: &Path, name: &str) -> bool {
        let mut failure = String::new();

        for attempt in 1..=self.attempts {
            let outcome = self.probe.wait(src);
            self.metrics.record_stability_wait(outcome.as_str());
            if !outcome.is_stable() {
                warn!(
                    file = %src.display(),
                    outcome = outcome.as_str(),
                    "file not stable before copy"
                );
                let _ = self.events.publish(Event::FileVanished {
                    pass_id,
                    name: name.to_string(),
                });
                failure = format!("file {} before copy", outcome.as_str());
                break;
            }

            match self.transfer_once(src, name) {
                Ok((bytes, sha256)) => {
                    self.metrics.record_copy_attempt("success");
                    self.metrics.record_file_copied(bytes);
                    info!(
                        src = %src.display(),
                        dst = %self.writer.target_description(name),
                        attempt,
                        sha256 = %sha256,
                        "file copied"
                    );
                    let _ = self.events.publish(Event::FileCopied {
                        pass_id,
                        name: name.to_string(),
                        bytes,
                        sha256,
                        attempt,
                    });
                    return true;
                }
                Err(err) => {
                    self.metrics.record_copy_attempt("failure");
                    error!(
                        src = %src.display(),
                        dst = %self.writer.target_description(name),
                        attempt,
                        error = ?err,
                        "copy attempt failed"
                    );
                    failure = format!("{err:?}");
                    if attempt < self.attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        let _ = self.events.publish(Event::FileFailed {
            pass_id,
            name: name.to_string(),
            message: failure,
        });
        false
    }

    fn transfer_once(&self, src: &Path, name: &str) -> PipelineResult<(u64, String)> {
        let sha256 = fingerprint(src)?;
        let bytes = self.writer.write_file(src, name)?;
        fs::remove_file(src)
            .map_err(|source| PipelineError::io("copy.remove_source", src, source))?;
        Ok((bytes, sha256))
    }
}
