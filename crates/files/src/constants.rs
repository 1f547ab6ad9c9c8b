/// Storage root used when no location is configured.
pub const DEFAULT_STORAGE_DIR: &str = "upload-dir";

/// Environment variable naming the storage root location.
pub const STORAGE_DIR_ENV: &str = "UPLOAD_STORAGE_DIR";

/// Size of the first read used to reject empty uploads before anything is written.
pub(crate) const HEAD_CHUNK_SIZE: usize = 8 * 1024;
