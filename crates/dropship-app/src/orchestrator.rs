//! Pass orchestration: a single cron-style pass and the persistent trigger
//! loop.
//!
//! # Design
//! - A pass is manifest phase first, copy phase second, over independent
//!   enumerations of the source directory. No candidates at all means no
//!   manifest artifact and no copy phase.
//! - The pipeline is synchronous and blocking; passes run on the blocking
//!   pool so the trigger loop's timers stay responsive.
//! - Trigger removal failure degrades health and is otherwise tolerated:
//!   the next poll may reprocess, which the idempotent pass absorbs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dropship_config::{RunMode, Settings};
use dropship_events::{Event, EventBus};
use dropship_pipeline::{CopyEngine, DestinationWriter, ManifestBuilder, StabilityProbe};
use dropship_telemetry::Metrics;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const HEALTH_COMPONENT: &str = "orchestrator";

/// Aggregate report of one manifest-plus-copy pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Identifier shared by all events of this pass.
    pub pass_id: Uuid,
    /// Path of the persisted manifest artifact, when one was written.
    pub manifest_path: Option<PathBuf>,
    /// Files recorded in the manifest phase.
    pub manifest_succeeded: u64,
    /// Files the manifest phase counted as failed.
    pub manifest_failed: u64,
    /// Candidate files enumerated by the copy phase.
    pub found: u64,
    /// Files copied and removed from the source.
    pub copied: u64,
    /// Files that exhausted their transfer attempts.
    pub failed: u64,
}

/// Coordinates the manifest builder and copy engine across run modes.
#[derive(Clone)]
pub struct IngestOrchestrator {
    settings: Settings,
    manifest: ManifestBuilder,
    engine: CopyEngine,
    events: EventBus,
    metrics: Metrics,
    health_degraded: Arc<Mutex<bool>>,
}

impl IngestOrchestrator {
    /// Wire an orchestrator from settings and a classified destination
    /// writer.
    #[must_use]
    pub fn new(
        settings: Settings,
        writer: DestinationWriter,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let manifest = ManifestBuilder::new(&settings, events.clone(), metrics.clone());
        let engine = CopyEngine::new(&settings, writer, events.clone(), metrics.clone());
        Self {
            settings,
            manifest,
            engine,
            events,
            metrics,
            health_degraded: Arc::new(Mutex::new(false)),
        }
    }

    /// Dispatch on the configured run mode.
    ///
    /// # Errors
    ///
    /// Returns an error only for orchestration failures (a panicked pass
    /// task); per-file trouble never surfaces here.
    pub async fn run(&self) -> AppResult<()> {
        match self.settings.run_mode {
            RunMode::Cron => {
                info!("running in cron mode: one pass and exit");
                let _report = self.process_pass().await?;
                info!("cron pass finished");
                Ok(())
            }
            RunMode::Trigger => {
                info!("running in trigger mode");
                self.run_trigger_loop().await
            }
        }
    }

    /// Execute one blocking pass on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error when the pass task cannot be joined.
    pub async fn process_pass(&self) -> AppResult<PassReport> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.process_once())
            .await
            .map_err(|err| AppError::Task {
                operation: "orchestrator.process_pass",
                message: err.to_string(),
            })
    }

    /// One full synchronous pass: manifest phase, artifact persistence, copy
    /// phase.
    ///
    /// With no candidate files at all, nothing is persisted and the copy
    /// phase is skipped.
    #[must_use]
    pub fn process_once(&self) -> PassReport {
        let pass_id = Uuid::new_v4();
        let _ = self.events.publish(Event::PassStarted { pass_id });

        let summary = self.manifest.build(pass_id);
        if summary.succeeded == 0 && summary.failed == 0 {
            info!("source directory has no candidate files; nothing to do");
            let _ = self.events.publish(Event::PassCompleted {
                pass_id,
                found: 0,
                copied: 0,
                failed: 0,
            });
            return PassReport {
                pass_id,
                ..PassReport::default()
            };
        }

        let manifest_path = match self.manifest.write(pass_id, summary.entries.clone()) {
            Ok(path) => path,
            Err(err) => {
                // The copy phase must not run without a persisted manifest;
                // untouched files are picked up by the next pass.
                error!(error = ?err, "manifest persistence failed; skipping the copy phase");
                self.mark_degraded("manifest persistence failed");
                let _ = self.events.publish(Event::PassCompleted {
                    pass_id,
                    found: 0,
                    copied: 0,
                    failed: 0,
                });
                return PassReport {
                    pass_id,
                    manifest_succeeded: summary.succeeded,
                    manifest_failed: summary.failed,
                    ..PassReport::default()
                };
            }
        };

        let outcome = self.engine.copy_all(pass_id);
        self.metrics.record_pass();
        let _ = self.events.publish(Event::PassCompleted {
            pass_id,
            found: outcome.found,
            copied: outcome.copied,
            failed: outcome.failed,
        });
        info!(
            found = outcome.found,
            copied = outcome.copied,
            failed = outcome.failed,
            manifest = %manifest_path.display(),
            manifest_succeeded = summary.succeeded,
            manifest_failed = summary.failed,
            "pass summary"
        );

        PassReport {
            pass_id,
            manifest_path: Some(manifest_path),
            manifest_succeeded: summary.succeeded,
            manifest_failed: summary.failed,
            found: outcome.found,
            copied: outcome.copied,
            failed: outcome.failed,
        }
    }

    /// Poll for the trigger marker, run a pass when it appears, delete it,
    /// and resume polling. Runs until the process is stopped.
    async fn run_trigger_loop(&self) -> AppResult<()> {
        let trigger_path = self.settings.source_dir.join(&self.settings.trigger_file);
        info!(trigger = %trigger_path.display(), "waiting for trigger marker");

        loop {
            if trigger_path.is_file() && self.trigger_is_stable(&trigger_path).await? {
                let _ = self.events.publish(Event::TriggerDetected {
                    path: trigger_path.display().to_string(),
                });
                info!(trigger = %trigger_path.display(), "trigger detected");

                let _report = self.process_pass().await?;

                match fs::remove_file(&trigger_path) {
                    Ok(()) => {
                        info!(trigger = %trigger_path.display(), "trigger removed");
                        let _ = self.events.publish(Event::TriggerCleared {
                            path: trigger_path.display().to_string(),
                        });
                        self.mark_recovered();
                    }
                    Err(err) => {
                        error!(
                            trigger = %trigger_path.display(),
                            error = %err,
                            "failed to remove trigger; the next poll may reprocess"
                        );
                        self.mark_degraded("trigger removal failed");
                    }
                }
            }
            tokio::time::sleep(self.settings.stability.poll_interval).await;
        }
    }

    /// Confirm the trigger marker itself has settled, guarding against a
    /// producer still writing it.
    async fn trigger_is_stable(&self, path: &Path) -> AppResult<bool> {
        let probe = StabilityProbe::from_settings(&self.settings.stability);
        let path = path.to_path_buf();
        let outcome = tokio::task::spawn_blocking(move || probe.wait(&path))
            .await
            .map_err(|err| AppError::Task {
                operation: "orchestrator.trigger_probe",
                message: err.to_string(),
            })?;
        Ok(outcome.is_stable())
    }

    fn lock_health_flag(&self) -> MutexGuard<'_, bool> {
        self.health_degraded
            .lock()
            .expect("health flag mutex poisoned")
    }

    fn mark_degraded(&self, detail: &str) {
        let mut guard = self.lock_health_flag();
        if *guard {
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                detail, "orchestrator still degraded"
            );
        } else {
            *guard = true;
            drop(guard);
            warn!(component = HEALTH_COMPONENT, detail, "orchestrator degraded");
            let _ = self.events.publish(Event::HealthChanged {
                degraded: vec![HEALTH_COMPONENT.to_string()],
            });
        }
    }

    fn mark_recovered(&self) {
        let mut guard = self.lock_health_flag();
        if std::mem::take(&mut *guard) {
            drop(guard);
            let _ = self.events.publish(Event::HealthChanged { degraded: vec![] });
            info!(component = HEALTH_COMPONENT, "orchestrator recovered");
        }
    }
}
