//! # Error Types
//!
//! Errors raised while handling license digests supplied from outside the
//! process (query strings, headers, cookies, stored rows).

use thiserror::Error;

/// A string could not be accepted as a [`crate::LicenseDigest`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// Wrong number of hex characters.
    #[error("license digest must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A character outside `[0-9a-f]`.
    #[error("license digest contains non-hex character {0:?}")]
    InvalidCharacter(char),
}
