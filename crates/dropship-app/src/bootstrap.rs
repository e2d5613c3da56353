//! Application bootstrap: environment loading and service wiring.
//!
//! # Design
//! - Startup failures (missing variables, invalid mode, malformed
//!   destination) surface before any file processing and exit non-zero.
//! - The destination address is classified exactly once here; the rest of
//!   the system only sees the resulting writer.

use std::sync::Arc;

use dropship_config::Settings;
use dropship_events::EventBus;
use dropship_pipeline::{Destination, DestinationWriter, MountedShareClient};
use dropship_telemetry::{LoggingConfig, Metrics, init_logging};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::orchestrator::IngestOrchestrator;

/// Dependencies required to bootstrap the daemon.
pub(crate) struct BootstrapDependencies {
    pub(crate) settings: Settings,
    pub(crate) logging: LoggingConfig<'static>,
    pub(crate) events: EventBus,
    pub(crate) metrics: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment.
    pub(crate) fn from_env() -> AppResult<Self> {
        let settings = Settings::from_env().map_err(|source| AppError::Config {
            operation: "settings.from_env",
            source,
        })?;
        let metrics = Metrics::new().map_err(|source| AppError::Telemetry {
            operation: "telemetry.metrics",
            source,
        })?;

        Ok(Self {
            settings,
            logging: LoggingConfig::default(),
            events: EventBus::new(),
            metrics,
        })
    }
}

/// Entry point for the daemon boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or startup fails; the process
/// exits non-zero before any file processing begins.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify
/// testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    init_logging(&dependencies.logging).map_err(|source| AppError::Telemetry {
        operation: "telemetry.init",
        source,
    })?;

    let BootstrapDependencies {
        settings,
        logging: _,
        events,
        metrics,
    } = dependencies;

    info!(
        source_dir = %settings.source_dir.display(),
        destination = %settings.destination,
        trigger = %settings.trigger_file,
        mode = settings.run_mode.as_str(),
        "dropship starting"
    );

    let destination = Destination::parse(&settings.destination).map_err(|source| {
        AppError::Pipeline {
            operation: "destination.parse",
            source,
        }
    })?;
    let writer = build_writer(&settings, destination)?;

    let orchestrator = IngestOrchestrator::new(settings, writer, events, metrics);
    orchestrator.run().await
}

/// Turn the classified destination into a writer, wiring the mounted share
/// client for `smb://` addresses.
fn build_writer(settings: &Settings, destination: Destination) -> AppResult<DestinationWriter> {
    match destination {
        Destination::Local(root) => Ok(DestinationWriter::local(root)),
        Destination::Share(address) => {
            let mount_root = settings
                .share_mount
                .clone()
                .ok_or(AppError::MissingState {
                    field: "share_mount",
                })?;
            if settings.share.is_configured() {
                debug!("share credentials are carried by the mount; SMB_USERNAME/SMB_PASSWORD unused");
            }
            Ok(DestinationWriter::share(
                address,
                Arc::new(MountedShareClient::new(mount_root)),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropship_config::{RetrySettings, RunMode, ShareCredentials, StabilitySettings};
    use std::path::PathBuf;
    use std::time::Duration;

    type TestResult<T> = anyhow::Result<T>;

    fn sample_settings(destination: &str, share_mount: Option<PathBuf>) -> Settings {
        Settings {
            source_dir: PathBuf::from("/drop/in"),
            destination: destination.to_string(),
            stability: StabilitySettings {
                threshold: Duration::from_secs(3),
                poll_interval: Duration::from_secs(1),
                max_wait: None,
            },
            retry: RetrySettings {
                attempts: 3,
                delay: Duration::from_secs(2),
            },
            trigger_file: "trigger.txt".to_string(),
            manifest_prefix: "manifest".to_string(),
            run_mode: RunMode::Cron,
            share: ShareCredentials::default(),
            share_mount,
        }
    }

    #[test]
    fn local_destinations_build_a_local_writer() -> TestResult<()> {
        let settings = sample_settings("/drop/out", None);
        let destination = Destination::parse(&settings.destination)?;

        let writer = build_writer(&settings, destination)?;
        assert!(matches!(writer, DestinationWriter::Local { .. }));
        Ok(())
    }

    #[test]
    fn share_destinations_require_a_mount_root() -> TestResult<()> {
        let settings = sample_settings("smb://nas/ingest/incoming", None);
        let destination = Destination::parse(&settings.destination)?;

        let err = build_writer(&settings, destination).expect_err("missing mount root");
        assert!(matches!(
            err,
            AppError::MissingState {
                field: "share_mount"
            }
        ));
        Ok(())
    }

    #[test]
    fn share_destinations_build_a_share_writer() -> TestResult<()> {
        let settings = sample_settings(
            "smb://nas/ingest/incoming",
            Some(PathBuf::from("/mnt/shares")),
        );
        let destination = Destination::parse(&settings.destination)?;

        let writer = build_writer(&settings, destination)?;
        assert!(matches!(writer, DestinationWriter::Share { .. }));
        Ok(())
    }
}
