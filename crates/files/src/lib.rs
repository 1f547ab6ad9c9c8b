//! Upload File Storage
//!
//! This crate owns a single storage root directory and stores uploaded files directly
//! beneath it.
//!
//! ## Storage Model
//!
//! - The root location is fixed when the service is constructed
//! - Entries are plain files at depth 1, named exactly as supplied by the uploader
//! - No metadata is persisted; the directory contents are the whole state
//! - Storing a name that already exists replaces the previous content
//!
//! ```text
//! <root>/
//! ├── a.txt
//! ├── b.txt
//! └── report.pdf
//! ```
//!
//! ## Path Safety
//!
//! Names come from untrusted clients. A name is only accepted for writing when its
//! lexically normalised destination sits *directly* under the root; anything else
//! (`..` segments, absolute overrides, nested directories) is rejected rather than
//! sanitised.
//!
//! ## Example Usage
//!
//! ```no_run
//! use upload_files::StorageService;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = StorageService::new("upload-dir")?;
//! storage.init()?;
//!
//! storage.store("hello.txt", &b"hello"[..])?;
//! for entry in storage.load_all()? {
//!     println!("{}", entry?.display());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod constants;
mod paths;
mod resource;
mod service;

pub use config::StorageConfig;
pub use constants::{DEFAULT_STORAGE_DIR, STORAGE_DIR_ENV};
pub use resource::Resource;
pub use service::{StorageService, StoredEntries};

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The configured root location is unusable (blank, or cannot be made absolute)
    #[error("Invalid storage configuration: {0}")]
    Configuration(String),

    /// The root directory could not be created
    #[error("Could not initialise storage: {0}")]
    Init(#[source] std::io::Error),

    /// The upload contained no bytes
    #[error("Failed to store empty file: {0}")]
    EmptyFile(String),

    /// The resolved destination is not directly under the root directory
    #[error("File name resolves outside the storage directory: {0}")]
    PathTraversal(String),

    /// Copying the upload to disk failed
    #[error("Failed to store file: {0}")]
    Write(#[source] std::io::Error),

    /// Listing the root directory failed
    #[error("Failed to read stored files: {0}")]
    Read(#[source] std::io::Error),

    /// The requested entry is missing or unreadable
    #[error("Could not read file: {0}")]
    NotFound(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
