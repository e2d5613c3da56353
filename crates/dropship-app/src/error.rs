//! # Design
//!
//! - Centralize application-level errors for bootstrap and orchestration.
//! - Keep error messages constant while carrying context fields for
//!   debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error("configuration loading failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: dropship_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: dropship_telemetry::TelemetryError,
    },
    /// Pipeline operations failed.
    #[error("pipeline operation failed")]
    Pipeline {
        /// Operation identifier.
        operation: &'static str,
        /// Source pipeline error.
        source: dropship_pipeline::PipelineError,
    },
    /// Required runtime state was missing.
    #[error("missing state")]
    MissingState {
        /// State field that was missing.
        field: &'static str,
    },
    /// A background task failed to complete.
    #[error("background task failed")]
    Task {
        /// Operation identifier.
        operation: &'static str,
        /// Rendered join failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_use_constant_messages() {
        let err = AppError::Config {
            operation: "settings.from_env",
            source: dropship_config::ConfigError::MissingEnv { name: "SOURCE_DIR" },
        };
        assert_eq!(err.to_string(), "configuration loading failed");

        let err = AppError::MissingState {
            field: "share_mount",
        };
        assert_eq!(err.to_string(), "missing state");
    }
}
