//! Storage configuration.
//!
//! The storage root is resolved once at process startup and then passed into
//! [`crate::StorageService`]. Request handlers never read the environment themselves.

use crate::constants::DEFAULT_STORAGE_DIR;
use crate::{StorageError, StorageResult};
use std::path::Path;
use upload_types::NonEmptyText;

/// Storage configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    location: NonEmptyText,
}

impl StorageConfig {
    /// Create a new `StorageConfig` rooted at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] if `location` is empty or whitespace.
    pub fn new(location: impl AsRef<str>) -> StorageResult<Self> {
        let location = NonEmptyText::new(location)
            .map_err(|e| StorageError::Configuration(format!("storage location {e}")))?;

        Ok(Self { location })
    }

    /// Build a config from an optional environment value.
    ///
    /// `None` or a blank value falls back to [`DEFAULT_STORAGE_DIR`].
    pub fn from_env_value(value: Option<String>) -> Self {
        let location = value
            .and_then(|v| v.parse::<NonEmptyText>().ok())
            .unwrap_or_else(|| {
                NonEmptyText::new(DEFAULT_STORAGE_DIR).expect("default location is non-empty")
            });

        Self { location }
    }

    pub fn location(&self) -> &Path {
        Path::new(self.location.as_str())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::from_env_value(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_locations_are_rejected() {
        for blank in ["", "   ", "\t\n"] {
            let result = StorageConfig::new(blank);
            assert!(
                matches!(result, Err(StorageError::Configuration(_))),
                "expected configuration error for {blank:?}"
            );
        }
    }

    #[test]
    fn env_value_falls_back_to_default() {
        assert_eq!(
            StorageConfig::from_env_value(None).location(),
            Path::new(DEFAULT_STORAGE_DIR)
        );
        assert_eq!(
            StorageConfig::from_env_value(Some("  ".into())).location(),
            Path::new(DEFAULT_STORAGE_DIR)
        );
    }

    #[test]
    fn env_value_is_used_when_present() {
        let cfg = StorageConfig::from_env_value(Some("/srv/uploads".into()));
        assert_eq!(cfg.location(), Path::new("/srv/uploads"));
    }
}
