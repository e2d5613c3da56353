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

//! Binary entrypoint that wires the Dropship services together and runs the
//! configured mode.

use dropship_app::{AppResult, run_app};

/// Bootstraps the ingestion daemon and blocks until it finishes or fails.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
