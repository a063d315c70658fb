//! # License Digests
//!
//! A license is identified by the lowercase hex SHA-256 of its exact text.
//! The digest is what users accept, what cookies and the
//! `LICENSE_ACCEPTED` header carry, and the primary key of the license
//! store. Identical text always yields the identical digest, on every
//! backend and across restarts.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::DigestError;

/// Number of hex characters in a SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Wire sentinel for [`DigestOutcome::Open`].
pub const OPEN_SENTINEL: &str = "OPEN";

/// Lowercase hex SHA-256 of a license text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseDigest(String);

impl LicenseDigest {
    /// Digest the exact bytes of `text`.
    pub fn of_text(text: &str) -> Self {
        let hash = Sha256::digest(text.as_bytes());
        Self(hash.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Accept an externally supplied digest string.
    ///
    /// Only lowercase hex of the right length is accepted. Uppercase is
    /// rejected rather than normalized so that a cookie name and the digest
    /// it encodes never disagree.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestError::InvalidLength {
                expected: DIGEST_HEX_LEN,
                actual: s.len(),
            });
        }
        if let Some(c) = s.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(DigestError::InvalidCharacter(c));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LicenseDigest {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LicenseDigest> for String {
    fn from(d: LicenseDigest) -> Self {
        d.0
    }
}

impl std::str::FromStr for LicenseDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Result of resolving the licenses that govern one artifact.
///
/// - `Open`: nothing to accept.
/// - `Digests(vec![])`: protected, but no license text could be
///   determined. Access control must deny.
/// - `Digests(non-empty)`: every digest must be accepted, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    Open,
    Digests(Vec<LicenseDigest>),
}

impl DigestOutcome {
    /// The protected-but-unresolvable outcome.
    pub fn unresolved() -> Self {
        Self::Digests(Vec::new())
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// True for the empty digest list.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Digests(d) if d.is_empty())
    }

    /// Digests to accept. Empty for `Open`.
    pub fn digests(&self) -> &[LicenseDigest] {
        match self {
            Self::Open => &[],
            Self::Digests(d) => d,
        }
    }
}

impl Serialize for DigestOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Open => serializer.serialize_str(OPEN_SENTINEL),
            Self::Digests(d) => d.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OutcomeRepr {
    Sentinel(String),
    List(Vec<LicenseDigest>),
}

impl<'de> Deserialize<'de> for DigestOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match OutcomeRepr::deserialize(deserializer)? {
            OutcomeRepr::Sentinel(s) if s == OPEN_SENTINEL => Ok(Self::Open),
            OutcomeRepr::Sentinel(s) => Err(serde::de::Error::custom(format!(
                "expected \"{OPEN_SENTINEL}\" or a digest list, got {s:?}"
            ))),
            OutcomeRepr::List(d) => Ok(Self::Digests(d)),
        }
    }
}
