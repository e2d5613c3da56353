//! Candidate enumeration for the source directory.
//!
//! # Design
//! - Candidates are discovered fresh on every pass; nothing is cached.
//! - The trigger marker, this system's own manifest artifacts, and
//!   non-regular entries are never candidates.
//! - An unreadable source directory yields an empty list ("nothing to do
//!   this pass"), never an error.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

/// Enumerate candidate files in `source_dir`, sorted by file name.
#[must_use]
pub fn list_candidates(source_dir: &Path, trigger_file: &str, manifest_prefix: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(source_dir) {
        Ok(entries) => entries,
        Err(err) => {
            error!(
                source_dir = %source_dir.display(),
                error = %err,
                "source directory is not enumerable; treating pass as empty"
            );
            return Vec::new();
        }
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    source_dir = %source_dir.display(),
                    error = %err,
                    "skipping unreadable directory entry"
                );
                continue;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            warn!(
                source_dir = %source_dir.display(),
                "skipping entry with non-UTF-8 name"
            );
            continue;
        };
        if name == trigger_file || is_manifest_artifact(name, manifest_prefix) {
            continue;
        }

        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => candidates.push(entry.path()),
            Ok(_) => {}
            Err(err) => {
                warn!(
                    path = %entry.path().display(),
                    error = %err,
                    "skipping entry with unreadable file type"
                );
            }
        }
    }

    candidates.sort();
    candidates
}

/// Whether a file name matches this system's own manifest artifacts.
fn is_manifest_artifact(name: &str, manifest_prefix: &str) -> bool {
    name.strip_prefix(manifest_prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|rest| rest.ends_with(".json"))
}
