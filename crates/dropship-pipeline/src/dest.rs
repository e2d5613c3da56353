//! Destination addressing and the polymorphic destination writer.
//!
//! # Design
//! - A destination string is classified exactly once, at wiring time: a
//!   recognised `smb://host/share/path` URL becomes a share address, anything
//!   else is a local path.
//! - The writer owns the per-file write semantics for both variants so the
//!   copy engine never branches on the destination kind.

use std::fmt::{self, Display, Formatter};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;
use tracing::warn;
use url::Url;

use crate::error::{PipelineError, PipelineResult};
use crate::share::ShareClient;

/// Classified destination address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A directory on the local filesystem.
    Local(PathBuf),
    /// A directory on a remote share.
    Share(ShareAddress),
}

impl Destination {
    /// Classify a raw destination string.
    ///
    /// Only the `smb` scheme is recognised as remote; everything else is
    /// treated as a local path. A string that claims the `smb` scheme but
    /// does not encode host, share, and in-share path is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDestination`] for malformed share
    /// addresses.
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        if !raw.get(..6).is_some_and(|prefix| prefix.eq_ignore_ascii_case("smb://")) {
            return Ok(Self::Local(PathBuf::from(raw)));
        }

        let parsed = Url::parse(raw).map_err(|_| PipelineError::InvalidDestination {
            value: raw.to_string(),
            reason: "malformed share url",
        })?;
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| PipelineError::InvalidDestination {
                value: raw.to_string(),
                reason: "missing host",
            })?
            .to_string();

        let mut segments = parsed
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()))
            .ok_or_else(|| PipelineError::InvalidDestination {
                value: raw.to_string(),
                reason: "missing share name",
            })?;
        let share = segments
            .next()
            .ok_or_else(|| PipelineError::InvalidDestination {
                value: raw.to_string(),
                reason: "missing share name",
            })?
            .to_string();
        let path = segments.collect::<Vec<_>>().join("/");
        if path.is_empty() {
            return Err(PipelineError::InvalidDestination {
                value: raw.to_string(),
                reason: "missing in-share path",
            });
        }

        Ok(Self::Share(ShareAddress { host, share, path }))
    }
}

/// Address of a file or directory on a remote share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareAddress {
    /// Server hosting the share.
    pub host: String,
    /// Name of the share on the server.
    pub share: String,
    /// Slash-separated path inside the share, without a leading slash.
    pub path: String,
}

impl ShareAddress {
    /// Append a file name to the in-share path.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        Self {
            host: self.host.clone(),
            share: self.share.clone(),
            path: format!("{}/{name}", self.path),
        }
    }

    /// Address of the containing directory, or `None` at the share root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.path.rsplit_once('/').map(|(dir, _)| Self {
            host: self.host.clone(),
            share: self.share.clone(),
            path: dir.to_string(),
        })
    }
}

impl Display for ShareAddress {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "smb://{}/{}/{}", self.host, self.share, self.path)
    }
}

/// Per-file writer for the classified destination.
#[derive(Clone)]
pub enum DestinationWriter {
    /// Writes into a local directory, preserving timestamps and permissions.
    Local {
        /// Destination directory for copied files.
        root: PathBuf,
    },
    /// Streams into a remote share through a [`ShareClient`].
    Share {
        /// Directory address files are written under.
        address: ShareAddress,
        /// Client providing the share's write contract.
        client: Arc<dyn ShareClient>,
    },
}

impl fmt::Debug for DestinationWriter {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { root } => formatter
                .debug_struct("Local")
                .field("root", root)
                .finish(),
            Self::Share { address, .. } => formatter
                .debug_struct("Share")
                .field("address", address)
                .finish_non_exhaustive(),
        }
    }
}

impl DestinationWriter {
    /// Construct a local-filesystem writer.
    #[must_use]
    pub const fn local(root: PathBuf) -> Self {
        Self::Local { root }
    }

    /// Construct a remote-share writer.
    #[must_use]
    pub fn share(address: ShareAddress, client: Arc<dyn ShareClient>) -> Self {
        Self::Share { address, client }
    }

    /// Write the source file under `name` at the destination, creating any
    /// missing intermediate directories, and return the bytes written.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when the write fails; the source file is
    /// left untouched.
    pub fn write_file(&self, src: &Path, name: &str) -> PipelineResult<u64> {
        match self {
            Self::Local { root } => write_local(src, &root.join(name)),
            Self::Share { address, client } => {
                write_share(src, &address.join(name), client.as_ref())
            }
        }
    }

    /// Rendered target path for log records.
    #[must_use]
    pub fn target_description(&self, name: &str) -> String {
        match self {
            Self::Local { root } => root.join(name).display().to_string(),
            Self::Share { address, .. } => address.join(name).to_string(),
        }
    }
}

fn write_local(src: &Path, dst: &Path) -> PipelineResult<u64> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| PipelineError::io("copy.create_parent", parent, source))?;
    }
    let bytes =
        fs::copy(src, dst).map_err(|source| PipelineError::io("copy.write_local", dst, source))?;

    // fs::copy carries permissions; the source mtime must be restored by hand.
    let metadata =
        fs::metadata(src).map_err(|source| PipelineError::io("copy.stat_source", src, source))?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(dst, mtime)
        .map_err(|source| PipelineError::io("copy.set_mtime", dst, source))?;

    Ok(bytes)
}

fn write_share(src: &Path, target: &ShareAddress, client: &dyn ShareClient) -> PipelineResult<u64> {
    if let Some(parent) = target.parent() {
        // Best-effort: a failed mkdir is a warning and the write still runs,
        // so an already-provisioned tree never blocks the transfer.
        if let Err(err) = client.create_dir_all(&parent) {
            warn!(
                address = %parent,
                error = %err,
                "share directory creation failed; attempting write anyway"
            );
        }
    }

    let mut reader =
        File::open(src).map_err(|source| PipelineError::io("copy.open_source", src, source))?;
    let mut writer = client
        .open_file(target)
        .map_err(|source| PipelineError::share("copy.open_share", target.to_string(), source))?;
    let bytes = io::copy(&mut reader, &mut writer)
        .map_err(|source| PipelineError::share("copy.write_share", target.to_string(), source))?;
    writer
        .flush()
        .map_err(|source| PipelineError::share("copy.flush_share", target.to_string(), source))?;

    Ok(bytes)
}
