//! # License Entity and Store Capability

use async_trait::async_trait;
use llp_core::LicenseDigest;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A license text, its digest and the theme it is presented with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub digest: LicenseDigest,
    pub text: String,
    pub theme: String,
}

impl License {
    /// Build a license, digesting `text`.
    pub fn new(text: impl Into<String>, theme: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            digest: LicenseDigest::of_text(&text),
            text,
            theme: theme.into(),
        }
    }
}

/// What [`LicenseStore::insert_if_absent`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// Persistent mapping from digest to license.
///
/// `insert_if_absent` must be safe under concurrent writers. Inserting an
/// identical row twice is a no-op. Inserting a different text under an
/// existing digest is [`StoreError::DigestCollision`]. The theme of the
/// first insert is kept.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    async fn insert_if_absent(&self, license: &License) -> Result<InsertOutcome, StoreError>;

    async fn get(&self, digest: &LicenseDigest) -> Result<Option<License>, StoreError>;

    /// Licenses for `digests`, in the given order, skipping unknown ones.
    async fn get_many(&self, digests: &[LicenseDigest]) -> Result<Vec<License>, StoreError> {
        let mut out = Vec::with_capacity(digests.len());
        for d in digests {
            if let Some(l) = self.get(d).await? {
                out.push(l);
            }
        }
        Ok(out)
    }

    async fn count(&self) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_digests_the_text() {
        let l = License::new("Sample text", "linaro");
        assert_eq!(l.digest, LicenseDigest::of_text("Sample text"));
        assert_eq!(l.theme, "linaro");
    }

    #[test]
    fn serializes_flat() {
        let l = License::new("t", "samsung");
        let v = serde_json::to_value(&l).unwrap();
        assert_eq!(v["digest"], l.digest.as_str());
        assert_eq!(v["text"], "t");
        assert_eq!(v["theme"], "samsung");
    }
}
