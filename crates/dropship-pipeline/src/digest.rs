//! Streaming SHA-256 content fingerprints.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{PipelineError, PipelineResult};

/// Block size used when streaming file content through the hash.
const BLOCK_SIZE: usize = 1024 * 1024;

/// Compute the SHA-256 digest of a file as a lowercase hex string.
///
/// The file is streamed in fixed-size blocks; memory use is independent of
/// the file size. Identical byte content always yields an identical digest.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] when the file cannot be opened or read.
pub fn fingerprint(path: &Path) -> PipelineResult<String> {
    fingerprint_with_block_size(path, BLOCK_SIZE)
}

fn fingerprint_with_block_size(path: &Path, block_size: usize) -> PipelineResult<String> {
    let mut file = File::open(path).map_err(|source| PipelineError::io("digest.open", path, source))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; block_size];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|source| PipelineError::io("digest.read", path, source))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    fn digest_is_deterministic() -> TestResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("payload.dat");
        fs::write(&path, b"the same bytes every time")?;

        assert_eq!(fingerprint(&path)?, fingerprint(&path)?);
        Ok(())
    }

    #[test]
    fn chunked_and_single_shot_digests_agree() -> TestResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("payload.dat");
        fs::write(&path, vec![0xAB_u8; 10_000])?;

        let chunked = fingerprint_with_block_size(&path, 7)?;
        let single = fingerprint_with_block_size(&path, 64 * 1024)?;
        assert_eq!(chunked, single);
        Ok(())
    }

    #[test]
    fn empty_file_digest_matches_the_known_constant() -> TestResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("empty.dat");
        fs::write(&path, b"")?;

        assert_eq!(
            fingerprint(&path)?,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        Ok(())
    }

    #[test]
    fn missing_file_surfaces_an_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = fingerprint(&dir.path().join("absent.dat")).expect_err("open failure");
        assert!(matches!(
            err,
            PipelineError::Io {
                operation: "digest.open",
                ..
            }
        ));
    }
}
