//! Environment loading for [`Settings`].
//!
//! # Design
//! - `Settings::from_env` reads the process environment; the lookup-injected
//!   variant keeps tests hermetic without mutating process state.
//! - Empty values are treated as unset, matching the behaviour of shell
//!   wrappers that export blank variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::defaults::{
    DEFAULT_MANIFEST_PREFIX, DEFAULT_POLL_INTERVAL_SECONDS, DEFAULT_RETRY_COUNT,
    DEFAULT_RETRY_DELAY_SECONDS, DEFAULT_STABLE_SECONDS, DEFAULT_TRIGGER_FILE,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{RetrySettings, RunMode, Settings, ShareCredentials, StabilitySettings};
use crate::validate::{parse_attempts, parse_seconds};

/// Source directory watched for deposited files.
pub const ENV_SOURCE_DIR: &str = "SOURCE_DIR";
/// Destination address (local path or `smb://` URL).
pub const ENV_TARGET_DIR: &str = "TARGET_DIR";
/// Stability threshold in seconds.
pub const ENV_STABLE_SECONDS: &str = "STABLE_SECONDS";
/// Poll interval in seconds.
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL";
/// Optional cap on a single stability wait, in seconds.
pub const ENV_MAX_WAIT_SECONDS: &str = "MAX_WAIT_SECONDS";
/// Trigger marker file name.
pub const ENV_TRIGGER_FILE: &str = "TRIGGER_FILE";
/// Per-file attempt budget.
pub const ENV_RETRY_COUNT: &str = "RETRY_COUNT";
/// Delay between attempts, in seconds.
pub const ENV_RETRY_DELAY: &str = "RETRY_DELAY";
/// Manifest artifact prefix.
pub const ENV_MANIFEST_PREFIX: &str = "MANIFEST_PREFIX";
/// Operating mode (`cron` or `trigger`).
pub const ENV_RUN_MODE: &str = "RUN_MODE";
/// Optional share account name.
pub const ENV_SMB_USERNAME: &str = "SMB_USERNAME";
/// Optional share account password.
pub const ENV_SMB_PASSWORD: &str = "SMB_PASSWORD";
/// Mount root for the mounted-share client.
pub const ENV_SMB_MOUNT_ROOT: &str = "SMB_MOUNT_ROOT";

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required variable is absent or a
    /// value fails to parse; callers treat this as fatal before any file
    /// processing begins.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an injected lookup function.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required variable is absent or a
    /// value fails to parse.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &'static str| {
            get(name).ok_or(ConfigError::MissingEnv { name })
        };

        let source_dir = PathBuf::from(require(ENV_SOURCE_DIR)?);
        let destination = require(ENV_TARGET_DIR)?;

        let threshold = get(ENV_STABLE_SECONDS).map_or(
            Ok(Duration::from_secs(DEFAULT_STABLE_SECONDS)),
            |raw| parse_seconds(ENV_STABLE_SECONDS, &raw),
        )?;
        let poll_interval = get(ENV_POLL_INTERVAL).map_or(
            Ok(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECONDS)),
            |raw| parse_seconds(ENV_POLL_INTERVAL, &raw),
        )?;
        let max_wait = get(ENV_MAX_WAIT_SECONDS)
            .map(|raw| parse_seconds(ENV_MAX_WAIT_SECONDS, &raw))
            .transpose()?;

        let attempts = get(ENV_RETRY_COUNT)
            .map_or(Ok(DEFAULT_RETRY_COUNT), |raw| {
                parse_attempts(ENV_RETRY_COUNT, &raw)
            })?;
        let delay = get(ENV_RETRY_DELAY).map_or(
            Ok(Duration::from_secs(DEFAULT_RETRY_DELAY_SECONDS)),
            |raw| parse_seconds(ENV_RETRY_DELAY, &raw),
        )?;

        let run_mode = get(ENV_RUN_MODE).map_or(Ok(RunMode::Trigger), |raw| raw.parse())?;

        Ok(Self {
            source_dir,
            destination,
            stability: StabilitySettings {
                threshold,
                poll_interval,
                max_wait,
            },
            retry: RetrySettings { attempts, delay },
            trigger_file: get(ENV_TRIGGER_FILE)
                .unwrap_or_else(|| DEFAULT_TRIGGER_FILE.to_string()),
            manifest_prefix: get(ENV_MANIFEST_PREFIX)
                .unwrap_or_else(|| DEFAULT_MANIFEST_PREFIX.to_string()),
            run_mode,
            share: ShareCredentials {
                username: get(ENV_SMB_USERNAME),
                password: get(ENV_SMB_PASSWORD),
            },
            share_mount: get(ENV_SMB_MOUNT_ROOT).map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([(ENV_SOURCE_DIR, "/drop/in"), (ENV_TARGET_DIR, "/drop/out")])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> ConfigResult<Settings> {
        Settings::from_lookup(|name| env.get(name).map(ToString::to_string))
    }

    #[test]
    fn defaults_apply_when_optional_variables_are_unset() -> anyhow::Result<()> {
        let settings = load(&base_env())?;

        assert_eq!(settings.source_dir, PathBuf::from("/drop/in"));
        assert_eq!(settings.destination, "/drop/out");
        assert_eq!(settings.stability.threshold, Duration::from_secs(3));
        assert_eq!(settings.stability.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.stability.max_wait, None);
        assert_eq!(settings.retry.attempts, 3);
        assert_eq!(settings.retry.delay, Duration::from_secs(2));
        assert_eq!(settings.trigger_file, "trigger.txt");
        assert_eq!(settings.manifest_prefix, "manifest");
        assert_eq!(settings.run_mode, RunMode::Trigger);
        assert!(!settings.share.is_configured());
        assert_eq!(settings.share_mount, None);
        Ok(())
    }

    #[test]
    fn explicit_values_override_defaults() -> anyhow::Result<()> {
        let mut env = base_env();
        env.insert(ENV_STABLE_SECONDS, "10");
        env.insert(ENV_POLL_INTERVAL, "5");
        env.insert(ENV_MAX_WAIT_SECONDS, "120");
        env.insert(ENV_RETRY_COUNT, "5");
        env.insert(ENV_RETRY_DELAY, "7");
        env.insert(ENV_TRIGGER_FILE, "ready.marker");
        env.insert(ENV_MANIFEST_PREFIX, "batch");
        env.insert(ENV_RUN_MODE, "cron");
        env.insert(ENV_SMB_USERNAME, "ingest");
        env.insert(ENV_SMB_MOUNT_ROOT, "/mnt/shares");

        let settings = load(&env)?;
        assert_eq!(settings.stability.threshold, Duration::from_secs(10));
        assert_eq!(settings.stability.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.stability.max_wait, Some(Duration::from_secs(120)));
        assert_eq!(settings.retry.attempts, 5);
        assert_eq!(settings.retry.delay, Duration::from_secs(7));
        assert_eq!(settings.trigger_file, "ready.marker");
        assert_eq!(settings.manifest_prefix, "batch");
        assert_eq!(settings.run_mode, RunMode::Cron);
        assert!(settings.share.is_configured());
        assert_eq!(settings.share_mount, Some(PathBuf::from("/mnt/shares")));
        Ok(())
    }

    #[test]
    fn missing_required_variable_is_fatal() {
        let mut env = base_env();
        env.remove(ENV_SOURCE_DIR);

        let err = load(&env).expect_err("missing source dir");
        assert_eq!(err, ConfigError::MissingEnv { name: ENV_SOURCE_DIR });
    }

    #[test]
    fn empty_required_variable_counts_as_missing() {
        let mut env = base_env();
        env.insert(ENV_TARGET_DIR, "  ");

        let err = load(&env).expect_err("blank target dir");
        assert_eq!(err, ConfigError::MissingEnv { name: ENV_TARGET_DIR });
    }

    #[test]
    fn unknown_run_mode_is_rejected() {
        let mut env = base_env();
        env.insert(ENV_RUN_MODE, "batch");

        let err = load(&env).expect_err("invalid run mode");
        assert!(matches!(err, ConfigError::InvalidMode { value } if value == "batch"));
    }
}
