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

//! Stability-gated, checksum-manifested file transfer pipeline.
//!
//! # Design
//! - A file is never hashed, recorded, or transferred while its size is still
//!   changing; the [`stability`] probe guards every read.
//! - The manifest pass is read-only; the copy pass deletes a source file only
//!   after its destination write returned without error.
//! - All per-file errors are contained: they surface as aggregate counts and
//!   log entries, never as an error crossing a pass boundary.
//!
//! Layout: `stability.rs` (size-poll probe), `digest.rs` (streaming SHA-256),
//! `scan.rs` (candidate enumeration), `manifest.rs` (manifest builder and
//! artifact writer), `dest.rs` (destination addressing and writers),
//! `share.rs` (remote-share client contract), `transfer.rs` (hashed copy
//! engine).

pub mod dest;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod scan;
pub mod share;
pub mod stability;
pub mod transfer;

pub use dest::{Destination, DestinationWriter, ShareAddress};
pub use digest::fingerprint;
pub use error::{PipelineError, PipelineResult};
pub use manifest::{Manifest, ManifestBuilder, ManifestEntry, ManifestSummary};
pub use scan::list_candidates;
pub use share::{MountedShareClient, ShareClient};
pub use stability::{Stability, StabilityProbe};
pub use transfer::{CopyEngine, CopyOutcome};
