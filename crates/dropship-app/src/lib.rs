#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Dropship application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (environment loading and service wiring),
//! `orchestrator.rs` (single-pass orchestration and the trigger loop).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level error types.
pub mod error;
/// Pass orchestration and run modes.
pub mod orchestrator;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
pub use orchestrator::{IngestOrchestrator, PassReport};
