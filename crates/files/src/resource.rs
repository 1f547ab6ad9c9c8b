//! Read handles for stored entries.
//!
//! A [`Resource`] is what the delivery layer receives from
//! [`crate::StorageService::load_as_resource`]: enough to decide whether the entry can
//! be served, to name it, and to stream its bytes.

use crate::paths::file_uri;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Handle to a stored entry, handed to the delivery layer for streaming.
///
/// The handle is resolved lazily: it records where the entry lives, and every check
/// consults the filesystem at the time it is made. An entry removed after the handle
/// was created simply stops existing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    path: PathBuf,
    uri: String,
}

impl Resource {
    /// Returns `None` when `path` has no `file://` form (it is not absolute).
    pub(crate) fn from_path(path: PathBuf) -> Option<Self> {
        let uri = file_uri(&path)?;
        Some(Self { path, uri })
    }

    /// Absolute location of the entry on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Percent-encoded `file://` URI of the entry.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Final path component, used as the download file name.
    pub fn filename(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// True when something, following symlinks, is present at the entry's location.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// True when the entry itself is a regular file that can be opened for reading
    /// right now.
    ///
    /// Symlinks are not readable resources, whatever they point at.
    pub fn is_readable(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok_and(|m| m.file_type().is_file())
            && fs::File::open(&self.path).is_ok()
    }

    /// Opens the entry for reading.
    pub fn open(&self) -> io::Result<fs::File> {
        fs::File::open(&self.path)
    }

    /// Size of the entry in bytes.
    pub fn content_length(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Last modification time reported by the filesystem.
    pub fn last_modified(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.path)?.modified()
    }

    /// Detected media type (MIME type), if available.
    ///
    /// Detection inspects magic bytes only and is best-effort; plain text and unknown
    /// formats yield `None`.
    pub fn media_type(&self) -> Option<&'static str> {
        infer::get_from_path(&self.path)
            .ok()
            .flatten()
            .map(|kind| kind.mime_type())
    }
}
