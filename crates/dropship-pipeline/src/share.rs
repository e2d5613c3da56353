//! Remote-share client contract.
//!
//! # Design
//! - The pipeline only needs two capabilities from a share client: best-effort
//!   directory creation and opening an in-share path for binary write. The
//!   concrete protocol client stays behind this trait.
//! - `MountedShareClient` serves deployments where the share is already
//!   mounted locally (kernel cifs, gvfs); it maps share addresses onto the
//!   mount root and doubles as the test implementation.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::dest::ShareAddress;

/// Write-side contract a remote share must provide.
pub trait ShareClient: Send + Sync {
    /// Create the directory at `address` and any missing parents.
    ///
    /// An already-existing directory is success, not an error.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the directory cannot be created.
    fn create_dir_all(&self, address: &ShareAddress) -> io::Result<()>;

    /// Open the file at `address` for binary write, truncating any previous
    /// content.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the file cannot be opened.
    fn open_file(&self, address: &ShareAddress) -> io::Result<Box<dyn Write + Send>>;
}

/// Share client backed by a locally mounted share tree.
///
/// `smb://host/share/path` resolves to `<mount_root>/<host>/<share>/<path>`.
#[derive(Debug, Clone)]
pub struct MountedShareClient {
    mount_root: PathBuf,
}

impl MountedShareClient {
    /// Construct a client rooted at the local mount point.
    #[must_use]
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        Self {
            mount_root: mount_root.into(),
        }
    }

    /// Map a share address onto the local mount tree.
    #[must_use]
    pub fn resolve(&self, address: &ShareAddress) -> PathBuf {
        self.mount_root
            .join(&address.host)
            .join(&address.share)
            .join(&address.path)
    }
}

impl ShareClient for MountedShareClient {
    fn create_dir_all(&self, address: &ShareAddress) -> io::Result<()> {
        let path = self.resolve(address);
        debug!(address = %address, path = %path.display(), "creating share directory");
        fs::create_dir_all(path)
    }

    fn open_file(&self, address: &ShareAddress) -> io::Result<Box<dyn Write + Send>> {
        let path = self.resolve(address);
        debug!(address = %address, path = %path.display(), "opening share file for write");
        Ok(Box::new(File::create(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    fn address(path: &str) -> ShareAddress {
        ShareAddress {
            host: "nas".to_string(),
            share: "ingest".to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn addresses_resolve_under_the_mount_root() {
        let client = MountedShareClient::new("/mnt/shares");
        assert_eq!(
            client.resolve(&address("incoming/batch.dat")),
            PathBuf::from("/mnt/shares/nas/ingest/incoming/batch.dat")
        );
    }

    #[test]
    fn directory_creation_is_idempotent() -> TestResult<()> {
        let mount = TempDir::new()?;
        let client = MountedShareClient::new(mount.path());

        client.create_dir_all(&address("incoming"))?;
        client.create_dir_all(&address("incoming"))?;
        assert!(mount.path().join("nas/ingest/incoming").is_dir());
        Ok(())
    }

    #[test]
    fn opened_files_receive_streamed_bytes() -> TestResult<()> {
        let mount = TempDir::new()?;
        let client = MountedShareClient::new(mount.path());
        client.create_dir_all(&address("incoming"))?;

        let mut writer = client.open_file(&address("incoming/batch.dat"))?;
        writer.write_all(b"streamed payload")?;
        writer.flush()?;
        drop(writer);

        let written = fs::read(mount.path().join("nas/ingest/incoming/batch.dat"))?;
        assert_eq!(written, b"streamed payload");
        Ok(())
    }
}
