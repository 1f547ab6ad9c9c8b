//! Validated primitive types for the upload storage service.
//!
//! Configuration values that must never be blank, such as the storage root location,
//! are checked once when they enter the process and carried as [`NonEmptyText`].

use std::str::FromStr;

/// Rejection reasons for [`NonEmptyText`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    #[error("value is blank")]
    Blank,
}

/// Text holding at least one non-whitespace character, stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input` and keeps it if anything remains.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Blank`] for empty or whitespace-only input.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        match input.as_ref().trim() {
            "" => Err(TextError::Blank),
            kept => Ok(Self(kept.to_owned())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
