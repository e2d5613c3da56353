//! Structured errors emitted while loading and validating configuration.

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading settings from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable was absent or empty.
    #[error("required environment variable '{name}' is not set")]
    MissingEnv {
        /// Name of the missing variable.
        name: &'static str,
    },

    /// A variable held a value that could not be parsed.
    #[error("invalid value '{value}' for '{name}': {reason}")]
    InvalidValue {
        /// Name of the offending variable.
        name: &'static str,
        /// Machine-readable reason for the rejection.
        reason: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The run mode was neither `cron` nor `trigger`.
    #[error("invalid run mode '{value}', expected 'cron' or 'trigger'")]
    InvalidMode {
        /// The rejected mode string.
        value: String,
    },
}
