//! Root-scoped storage service implementation
//!
//! [`StorageService`] binds one root directory at construction and exposes the whole
//! storage lifecycle over it: create the root, store uploads into it, enumerate its
//! entries, hand out readable resources and wipe it.
//!
//! # Security Model
//!
//! - Upload names are untrusted; `store` accepts a name only when its normalised
//!   destination's parent is exactly the root
//! - Offending names are rejected with [`StorageError::PathTraversal`], never rewritten
//! - `load_as_resource` applies the same check before touching the filesystem
//! - Symlinks under the root are never followed: `store` replaces a link with a
//!   regular file, and `load_as_resource` reports a link as not found
//! - `load` is a plain path computation and performs no check at all
//!
//! # Implementation Notes
//!
//! - The service holds only the absolute root path; it is cheap to clone and share
//! - Every call goes straight to the filesystem, nothing is cached
//! - Overwrites are not atomic: a crash mid-copy can leave a partially written file

use crate::constants::HEAD_CHUNK_SIZE;
use crate::paths;
use crate::{Resource, StorageConfig, StorageError, StorageResult};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Service for storing uploaded files under a single root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageService {
    /// Absolute, normalised root directory
    root_location: PathBuf,
}

impl StorageService {
    /// Creates a service bound to `root`.
    ///
    /// A relative `root` is resolved against the current working directory now, so
    /// later changes of directory do not move the storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] if `root` is blank after trimming or
    /// cannot be made absolute.
    pub fn new(root: &str) -> StorageResult<Self> {
        Self::from_config(&StorageConfig::new(root)?)
    }

    /// Creates a service from a resolved [`StorageConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] if the location cannot be made absolute.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let root_location = paths::absolute(config.location()).map_err(|e| {
            StorageError::Configuration(format!(
                "Cannot resolve storage location {}: {}",
                config.location().display(),
                e
            ))
        })?;

        Ok(Self { root_location })
    }

    /// Returns the absolute root directory.
    #[must_use]
    pub fn root_location(&self) -> &Path {
        &self.root_location
    }

    /// Creates the root directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Init`] if the directory cannot be created.
    pub fn init(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root_location).map_err(StorageError::Init)?;
        tracing::debug!(root = %self.root_location.display(), "storage initialised");
        Ok(())
    }

    /// Stores `content` under `name`, replacing any existing entry of that name.
    ///
    /// The reader is consumed and dropped on every path out of this method.
    ///
    /// # Returns
    ///
    /// The stored entry's path relative to the root.
    ///
    /// # Errors
    ///
    /// - [`StorageError::EmptyFile`] if `content` yields no bytes; nothing is written
    /// - [`StorageError::PathTraversal`] if `name` does not resolve to a direct child
    ///   of the root; nothing is written
    /// - [`StorageError::Write`] if reading `content` or writing the file fails
    pub fn store<R: Read>(&self, name: &str, mut content: R) -> StorageResult<PathBuf> {
        let mut head = vec![0u8; HEAD_CHUNK_SIZE];
        let head_len = read_some(&mut content, &mut head).map_err(StorageError::Write)?;
        if head_len == 0 {
            return Err(StorageError::EmptyFile(name.to_owned()));
        }

        let destination =
            paths::resolve_direct_child(&self.root_location, name).ok_or_else(|| {
                tracing::warn!(name, "rejected upload outside storage root");
                StorageError::PathTraversal(name.to_owned())
            })?;

        unlink_symlink(&destination.path).map_err(StorageError::Write)?;
        let mut file = fs::File::create(&destination.path).map_err(StorageError::Write)?;
        file.write_all(&head[..head_len]).map_err(StorageError::Write)?;
        let rest = io::copy(&mut content, &mut file).map_err(StorageError::Write)?;

        tracing::info!(name, bytes = head_len as u64 + rest, "stored file");

        Ok(destination.name)
    }

    /// Lists the direct children of the root, relative to the root.
    ///
    /// The returned iterator reads the directory as it is advanced and cannot be
    /// restarted; call again for a fresh listing. Order is whatever the filesystem
    /// reports.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the root cannot be opened. Failures reading an
    /// individual entry are yielded by the iterator.
    pub fn load_all(&self) -> StorageResult<StoredEntries> {
        let entries = fs::read_dir(&self.root_location).map_err(StorageError::Read)?;
        Ok(StoredEntries { entries })
    }

    /// Resolves `name` against the root without touching the filesystem.
    ///
    /// No traversal check is made; callers handling untrusted names should use
    /// [`Self::load_as_resource`].
    #[must_use]
    pub fn load(&self, name: &str) -> PathBuf {
        self.root_location.join(name)
    }

    /// Resolves `name` to a readable [`Resource`].
    ///
    /// # Errors
    ///
    /// - [`StorageError::PathTraversal`] if `name` does not resolve to a direct child
    ///   of the root
    /// - [`StorageError::NotFound`] if the entry is missing, is not a readable regular
    ///   file (symlinks included), or has no `file://` form
    pub fn load_as_resource(&self, name: &str) -> StorageResult<Resource> {
        let child = paths::resolve_direct_child(&self.root_location, name).ok_or_else(|| {
            tracing::warn!(name, "rejected read outside storage root");
            StorageError::PathTraversal(name.to_owned())
        })?;

        let resource = Resource::from_path(child.path)
            .ok_or_else(|| StorageError::NotFound(name.to_owned()))?;

        if resource.exists() && resource.is_readable() {
            Ok(resource)
        } else {
            Err(StorageError::NotFound(name.to_owned()))
        }
    }

    /// Removes the root directory and everything beneath it.
    ///
    /// Best-effort: individual failures are logged and skipped, and nothing is
    /// reported to the caller. Call [`Self::init`] before storing again.
    pub fn delete_all(&self) {
        let failures = remove_tree(&self.root_location);
        if failures == 0 {
            tracing::info!(root = %self.root_location.display(), "storage wiped");
        } else {
            tracing::warn!(
                root = %self.root_location.display(),
                failures,
                "storage wipe left entries behind"
            );
        }
    }
}

/// Single-pass listing of the storage root, produced by [`StorageService::load_all`].
#[derive(Debug)]
pub struct StoredEntries {
    entries: fs::ReadDir,
}

impl Iterator for StoredEntries {
    type Item = StorageResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|entry| {
            entry
                .map(|e| PathBuf::from(e.file_name()))
                .map_err(StorageError::Read)
        })
    }
}

/// Removes `path` if it is a symlink, so a following create makes a fresh file under
/// the root rather than writing through to the link's target.
fn unlink_symlink(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            tracing::debug!(path = %path.display(), "replacing symlink with stored file");
            fs::remove_file(path)
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Reads once into `buf`, retrying on interruption.
fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Deletes `path` recursively, carrying on past failures.
///
/// Symlinks are removed, never followed. Returns the number of failures.
fn remove_tree(path: &Path) -> usize {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot inspect entry");
            return 1;
        }
    };

    if !metadata.is_dir() {
        return match fs::remove_file(path) {
            Ok(()) => 0,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot delete file");
                1
            }
        };
    }

    let mut failures = 0;
    match fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(entry) => failures += remove_tree(&entry.path()),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "cannot read entry");
                        failures += 1;
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot list directory");
            failures += 1;
        }
    }

    if let Err(e) = fs::remove_dir(path) {
        tracing::warn!(path = %path.display(), error = %e, "cannot delete directory");
        failures += 1;
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    /// Helper to build an initialised service rooted inside a temp dir
    fn init_service(temp: &TempDir) -> StorageService {
        let root = temp.path().join("uploads");
        let service = StorageService::new(root.to_str().unwrap()).unwrap();
        service.init().unwrap();
        service
    }

    fn listed(service: &StorageService) -> HashSet<PathBuf> {
        service
            .load_all()
            .unwrap()
            .collect::<StorageResult<HashSet<_>>>()
            .unwrap()
    }

    /// Reader that fails on first use
    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
        }
    }

    #[test]
    fn test_new_rejects_blank_root() {
        assert!(matches!(
            StorageService::new(""),
            Err(StorageError::Configuration(_))
        ));
        assert!(matches!(
            StorageService::new("   "),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_new_makes_root_absolute() {
        let service = StorageService::new("upload-dir").unwrap();

        assert!(service.root_location().is_absolute());
        assert!(service.root_location().ends_with("upload-dir"));
    }

    #[test]
    fn test_init_creates_nested_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("a").join("b").join("uploads");
        let service = StorageService::new(root.to_str().unwrap()).unwrap();

        service.init().unwrap();
        assert!(root.is_dir());

        // second call is a no-op
        service.init().unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_init_fails_when_root_is_a_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("taken");
        fs::write(&root, "not a directory").unwrap();
        let service = StorageService::new(root.to_str().unwrap()).unwrap();

        assert!(matches!(service.init(), Err(StorageError::Init(_))));
    }

    #[test]
    fn test_store_writes_file() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        let stored = service.store("hello.txt", &b"hello"[..]).unwrap();

        assert_eq!(stored, PathBuf::from("hello.txt"));
        assert_eq!(
            fs::read(service.root_location().join("hello.txt")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_store_copies_content_larger_than_first_chunk() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        let content: Vec<u8> = (0..HEAD_CHUNK_SIZE * 3 + 17).map(|i| i as u8).collect();

        service.store("big.bin", content.as_slice()).unwrap();

        assert_eq!(fs::read(service.load("big.bin")).unwrap(), content);
    }

    #[test]
    fn test_store_empty_file_rejected() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        let result = service.store("empty.txt", io::empty());

        assert!(matches!(result, Err(StorageError::EmptyFile(_))));
        assert!(!service.load("empty.txt").exists());
        assert!(listed(&service).is_empty());
    }

    #[test]
    fn test_store_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        for name in ["../../etc/passwd", "../escaped.txt", "nested/a.txt", "", "."] {
            let result = service.store(name, &b"payload"[..]);
            assert!(
                matches!(result, Err(StorageError::PathTraversal(_))),
                "expected traversal error for {name:?}"
            );
        }

        assert!(!temp.path().join("escaped.txt").exists());
        assert!(listed(&service).is_empty());
    }

    #[test]
    fn test_store_rejects_absolute_override() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        let outside = temp.path().join("outside.txt");

        let result = service.store(outside.to_str().unwrap(), &b"payload"[..]);

        assert!(matches!(result, Err(StorageError::PathTraversal(_))));
        assert!(!outside.exists());
    }

    #[test]
    fn test_store_overwrites_existing() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        service.store("report.txt", &b"hello"[..]).unwrap();
        service.store("report.txt", &b"world"[..]).unwrap();

        assert_eq!(listed(&service), HashSet::from([PathBuf::from("report.txt")]));
        assert_eq!(
            fs::read_to_string(service.load("report.txt")).unwrap(),
            "world"
        );
    }

    #[test]
    fn test_store_overwrite_with_shorter_content_truncates() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        service.store("notes.txt", &b"a much longer first draft"[..]).unwrap();
        service.store("notes.txt", &b"short"[..]).unwrap();

        assert_eq!(fs::read_to_string(service.load("notes.txt")).unwrap(), "short");
    }

    #[test]
    fn test_store_reader_failure_is_write_error() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        let result = service.store("broken.txt", BrokenReader);

        assert!(matches!(result, Err(StorageError::Write(_))));
        assert!(!service.load("broken.txt").exists());
    }

    #[test]
    fn test_store_without_init_is_write_error() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("never-created");
        let service = StorageService::new(root.to_str().unwrap()).unwrap();

        let result = service.store("a.txt", &b"data"[..]);

        assert!(matches!(result, Err(StorageError::Write(_))));
    }

    #[test]
    fn test_load_all_lists_direct_children_only() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        service.store("a.txt", &b"a"[..]).unwrap();
        service.store("b.txt", &b"b"[..]).unwrap();
        let nested = service.root_location().join("sub");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("deep.txt"), "deep").unwrap();

        let entries = listed(&service);

        assert_eq!(
            entries,
            HashSet::from([
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
                PathBuf::from("sub"),
            ])
        );
        assert!(!entries.contains(Path::new("")));
    }

    #[test]
    fn test_load_all_missing_root_is_read_error() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("missing");
        let service = StorageService::new(root.to_str().unwrap()).unwrap();

        assert!(matches!(service.load_all(), Err(StorageError::Read(_))));
    }

    #[test]
    fn test_load_is_pure_path_computation() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        assert_eq!(
            service.load("anything.txt"),
            service.root_location().join("anything.txt")
        );
        assert_eq!(
            service.load("../outside.txt"),
            service.root_location().join("../outside.txt")
        );
    }

    #[test]
    fn test_load_as_resource_success() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        service.store("a.txt", &b"alpha"[..]).unwrap();

        let resource = service.load_as_resource("a.txt").unwrap();

        assert_eq!(resource.path(), service.load("a.txt"));
        assert_eq!(resource.filename(), Some("a.txt"));
        let mut content = String::new();
        resource.open().unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "alpha");
    }

    #[test]
    fn test_load_as_resource_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);

        let result = service.load_as_resource("missing.txt");

        assert!(matches!(result, Err(StorageError::NotFound(name)) if name == "missing.txt"));
    }

    #[test]
    fn test_load_as_resource_directory_is_not_found() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        fs::create_dir(service.root_location().join("sub")).unwrap();

        assert!(matches!(
            service.load_as_resource("sub"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_as_resource_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        fs::write(temp.path().join("secret.txt"), "secret").unwrap();

        let err = service.load_as_resource("../secret.txt").unwrap_err();
        assert!(matches!(err, StorageError::PathTraversal(_)));
        assert_eq!(
            err.to_string(),
            "File name resolves outside the storage directory: ../secret.txt"
        );
    }

    #[test]
    fn test_delete_all_then_reinit() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        service.store("a.txt", &b"a"[..]).unwrap();
        let nested = service.root_location().join("sub");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("deep.txt"), "deep").unwrap();

        service.delete_all();

        assert!(!service.root_location().exists());
        match service.load_all() {
            Ok(entries) => assert_eq!(entries.count(), 0),
            Err(e) => assert!(matches!(e, StorageError::Read(_))),
        }

        service.init().unwrap();
        assert!(listed(&service).is_empty());
    }

    #[test]
    fn test_delete_all_on_missing_root_is_silent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("never-created");
        let service = StorageService::new(root.to_str().unwrap()).unwrap();

        service.delete_all();

        assert!(!root.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_all_does_not_follow_symlinks() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        let keep = temp.path().join("keep");
        fs::create_dir(&keep).unwrap();
        fs::write(keep.join("kept.txt"), "kept").unwrap();
        std::os::unix::fs::symlink(&keep, service.root_location().join("link")).unwrap();

        service.delete_all();

        assert!(!service.root_location().exists());
        assert!(keep.join("kept.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_store_replaces_symlink_instead_of_following_it() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        let outside = temp.path().join("outside.txt");
        fs::write(&outside, "original").unwrap();
        let link = service.root_location().join("link.txt");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        let stored = service.store("link.txt", &b"replaced"[..]).unwrap();

        assert_eq!(stored, PathBuf::from("link.txt"));
        assert_eq!(fs::read_to_string(&outside).unwrap(), "original");
        let metadata = fs::symlink_metadata(&link).unwrap();
        assert!(metadata.file_type().is_file());
        assert_eq!(fs::read_to_string(&link).unwrap(), "replaced");
    }

    #[cfg(unix)]
    #[test]
    fn test_store_replaces_dangling_symlink() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        let target = temp.path().join("not-yet.txt");
        let link = service.root_location().join("dangling.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        service.store("dangling.txt", &b"data"[..]).unwrap();

        assert!(!target.exists());
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_as_resource_refuses_symlink() {
        let temp = TempDir::new().unwrap();
        let service = init_service(&temp);
        let outside = temp.path().join("secret.txt");
        fs::write(&outside, "secret").unwrap();
        std::os::unix::fs::symlink(&outside, service.root_location().join("link.txt")).unwrap();

        let result = service.load_as_resource("link.txt");

        assert!(matches!(result, Err(StorageError::NotFound(name)) if name == "link.txt"));
    }
}
