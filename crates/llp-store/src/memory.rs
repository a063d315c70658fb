//! # In-Memory License Store
//!
//! Used when no `DATABASE_URL` is configured, by the CLI and in tests.
//! The lock is `parking_lot` and is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use llp_core::LicenseDigest;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::license::{InsertOutcome, License, LicenseStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryLicenseStore {
    data: Arc<RwLock<HashMap<LicenseDigest, License>>>,
}

impl MemoryLicenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored license, sorted by digest.
    pub fn list(&self) -> Vec<License> {
        let mut all: Vec<_> = self.data.read().values().cloned().collect();
        all.sort_by(|a, b| a.digest.cmp(&b.digest));
        all
    }
}

#[async_trait]
impl LicenseStore for MemoryLicenseStore {
    async fn insert_if_absent(&self, license: &License) -> Result<InsertOutcome, StoreError> {
        let mut guard = self.data.write();
        let same_text = guard
            .get(&license.digest)
            .map(|existing| existing.text == license.text);
        match same_text {
            Some(true) => Ok(InsertOutcome::AlreadyPresent),
            Some(false) => {
                tracing::error!(
                    digest = %license.digest,
                    "license store holds a different text under the same digest"
                );
                Err(StoreError::DigestCollision {
                    digest: license.digest.clone(),
                })
            }
            None => {
                guard.insert(license.digest.clone(), license.clone());
                tracing::debug!(digest = %license.digest, theme = %license.theme, "stored new license");
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn get(&self, digest: &LicenseDigest) -> Result<Option<License>, StoreError> {
        Ok(self.data.read().get(digest).cloned())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.data.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_twice_keeps_one_row() {
        let store = MemoryLicenseStore::new();
        let l = License::new("Sample text", "linaro");

        assert_eq!(store.insert_if_absent(&l).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert_if_absent(&l).await.unwrap(),
            InsertOutcome::AlreadyPresent
        );
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(&l.digest).await.unwrap(), Some(l));
    }

    #[tokio::test]
    async fn first_theme_wins() {
        let store = MemoryLicenseStore::new();
        store
            .insert_if_absent(&License::new("t", "samsung"))
            .await
            .unwrap();
        let again = License::new("t", "linaro");
        assert_eq!(
            store.insert_if_absent(&again).await.unwrap(),
            InsertOutcome::AlreadyPresent
        );
        let stored = store.get(&again.digest).await.unwrap().unwrap();
        assert_eq!(stored.theme, "samsung");
    }

    #[tokio::test]
    async fn different_text_under_same_digest_is_a_collision() {
        let store = MemoryLicenseStore::new();
        let genuine = License::new("original", "linaro");
        store.insert_if_absent(&genuine).await.unwrap();

        let forged = License {
            digest: genuine.digest.clone(),
            text: "tampered".into(),
            theme: "linaro".into(),
        };
        let err = store.insert_if_absent(&forged).await.unwrap_err();
        assert!(matches!(err, StoreError::DigestCollision { .. }));
        assert_eq!(store.get(&genuine.digest).await.unwrap(), Some(genuine));
    }

    #[tokio::test]
    async fn get_many_preserves_order_and_skips_unknown() {
        let store = MemoryLicenseStore::new();
        let a = License::new("a", "linaro");
        let b = License::new("b", "linaro");
        store.insert_if_absent(&a).await.unwrap();
        store.insert_if_absent(&b).await.unwrap();

        let unknown = LicenseDigest::of_text("never stored");
        let got = store
            .get_many(&[b.digest.clone(), unknown, a.digest.clone()])
            .await
            .unwrap();
        assert_eq!(got, vec![b, a]);
    }

    #[tokio::test]
    async fn concurrent_inserts_are_idempotent() {
        let store = MemoryLicenseStore::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let s = store.clone();
            handles.push(tokio::spawn(async move {
                s.insert_if_absent(&License::new("shared", "linaro")).await
            }));
        }
        let mut inserted = 0;
        for h in handles {
            if h.await.unwrap().unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
