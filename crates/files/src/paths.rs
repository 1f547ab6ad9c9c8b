//! Lexical path handling for the storage root.
//!
//! Nothing here touches the filesystem: destinations are judged on their normalised
//! form, so a name is accepted or rejected before any file is opened.

use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Bytes left as-is in a `file://` URI path: RFC 3986 unreserved characters and `/`.
const FILE_URI_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// A name that resolved to an entry directly under the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirectChild {
    /// Absolute, normalised location of the entry
    pub(crate) path: PathBuf,
    /// Entry name relative to the root
    pub(crate) name: PathBuf,
}

/// Collapses `.` and `..` components without consulting the filesystem.
///
/// `..` directly under the filesystem root stays at the root; leading `..` on a
/// relative path is preserved.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }

    out
}

/// Makes `path` absolute against the working directory and normalises it.
pub(crate) fn absolute(path: &Path) -> io::Result<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}

/// Resolves `name` under `root`, keeping it only if the result's parent is exactly
/// `root`.
///
/// `root` must already be absolute and normalised.
pub(crate) fn resolve_direct_child(root: &Path, name: &str) -> Option<DirectChild> {
    let path = normalize(&root.join(name));
    if path.parent() != Some(root) {
        return None;
    }

    let name = PathBuf::from(path.file_name()?);
    Some(DirectChild { path, name })
}

/// Renders an absolute path as a `file://` URI, percent-encoding every byte outside
/// the unreserved set and `/`.
///
/// Returns `None` for relative paths, which have no URI form.
pub(crate) fn file_uri(path: &Path) -> Option<String> {
    if !path.is_absolute() {
        return None;
    }

    let encoded = percent_encode(path.as_os_str().as_encoded_bytes(), FILE_URI_PATH);
    Some(format!("file://{encoded}"))
}
