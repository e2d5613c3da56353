//! # Design
//!
//! - Provide structured, constant-message errors for the transfer pipeline.
//! - Capture operation context (paths, addresses) to make failures
//!   reproducible in tests.
//! - Preserve source errors without interpolating context into error
//!   messages.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors produced by the transfer pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// IO failures while interacting with the filesystem.
    #[error("pipeline io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// JSON serialization failures for the manifest artifact.
    #[error("pipeline json failure")]
    Json {
        /// Operation that triggered the JSON failure.
        operation: &'static str,
        /// Path involved in the JSON failure.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// Remote-share client failures.
    #[error("pipeline share failure")]
    Share {
        /// Operation that triggered the share failure.
        operation: &'static str,
        /// Rendered share address involved in the failure.
        address: String,
        /// Underlying IO error reported by the client.
        source: io::Error,
    },
    /// The destination address could not be classified.
    #[error("invalid destination address")]
    InvalidDestination {
        /// The rejected address.
        value: String,
        /// Static reason for the rejection.
        reason: &'static str,
    },
}

impl PipelineError {
    /// Construct an IO error with operation and path context.
    pub(crate) fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Construct a JSON error with operation and path context.
    pub(crate) fn json(operation: &'static str, path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Construct a share error with operation and address context.
    pub(crate) fn share(operation: &'static str, address: String, source: io::Error) -> Self {
        Self::Share {
            operation,
            address,
            source,
        }
    }
}
