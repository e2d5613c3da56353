//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers constructed once at startup and passed by reference
//!   into each component; no process-global mutable state.
//! - Keeps parsing and environment access in `loader.rs`/`validate.rs`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete daemon configuration, resolved from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory watched for deposited files and the trigger marker.
    pub source_dir: PathBuf,
    /// Destination address: a local path or an `smb://host/share/path` URL.
    pub destination: String,
    /// Stability detection tunables.
    pub stability: StabilitySettings,
    /// Per-file retry tunables.
    pub retry: RetrySettings,
    /// File name of the trigger marker inside the source directory.
    pub trigger_file: String,
    /// Prefix of the manifest artifact written to the source directory.
    pub manifest_prefix: String,
    /// Operating mode selected at startup.
    pub run_mode: RunMode,
    /// Optional credentials forwarded to remote-share clients.
    pub share: ShareCredentials,
    /// Mount root consumed by the mounted-share client for `smb://`
    /// destinations.
    pub share_mount: Option<PathBuf>,
}

/// Tunables for the size-polling stability detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilitySettings {
    /// How long a file's size must remain unchanged to count as stable.
    pub threshold: Duration,
    /// Interval between size polls.
    pub poll_interval: Duration,
    /// Optional cap on the total wait; `None` blocks until stable or vanished.
    pub max_wait: Option<Duration>,
}

/// Per-file attempt budget and backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Attempts per file before it counts as failed; always at least one.
    pub attempts: u32,
    /// Fixed delay slept between attempts.
    pub delay: Duration,
}

/// Optional credentials for remote-share clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareCredentials {
    /// Account name, when the share requires authentication.
    pub username: Option<String>,
    /// Account password, when the share requires authentication.
    pub password: Option<String>,
}

impl ShareCredentials {
    /// Whether any credential component is present.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }
}

/// Operating mode recorded in `RUN_MODE`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Run a single pass and exit; suitable for periodic invocation.
    Cron,
    /// Poll for the trigger marker in a persistent loop.
    Trigger,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cron" => Ok(Self::Cron),
            "trigger" => Ok(Self::Trigger),
            other => Err(ConfigError::InvalidMode {
                value: other.to_string(),
            }),
        }
    }
}

impl RunMode {
    /// Render the mode as its lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cron => "cron",
            Self::Trigger => "trigger",
        }
    }
}
