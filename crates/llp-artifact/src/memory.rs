//! # In-Memory Object Store
//!
//! A [`BTreeMap`]-backed [`ObjectStore`] for tests, the CLI and embedding.
//! [`MemoryObjectStore::set_available`] simulates an outage so callers can
//! exercise their storage-failure paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::object::{ObjectListing, ObjectMeta, ObjectStore};

#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>,
    available: AtomicBool,
    base_url: String,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_base_url("http://objects.localhost")
    }

    /// Presigned URLs are minted under `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn put(&self, key: impl Into<String>, body: Vec<u8>) {
        self.objects.write().insert(key.into(), (body, Utc::now()));
    }

    pub fn remove(&self, key: &str) -> bool {
        self.objects.write().remove(key).is_some()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory store marked unavailable".into()))
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.check()?;
        Ok(self.objects.read().get(key).map(|(body, _)| body.clone()))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
        self.check()?;
        Ok(self.objects.read().get(key).map(|(body, modified)| ObjectMeta {
            key: key.to_string(),
            size: body.len() as u64,
            last_modified: *modified,
        }))
    }

    async fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<ObjectListing, StorageError> {
        self.check()?;
        let guard = self.objects.read();
        let mut listing = ObjectListing::default();
        for (key, (body, modified)) in guard.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            match delimiter.and_then(|d| rest.find(d).map(|i| (d, i))) {
                Some((d, i)) => {
                    let common = format!("{prefix}{}", &rest[..i + d.len_utf8()]);
                    if listing.common_prefixes.last() != Some(&common) {
                        listing.common_prefixes.push(common);
                    }
                }
                None => listing.objects.push(ObjectMeta {
                    key: key.clone(),
                    size: body.len() as u64,
                    last_modified: *modified,
                }),
            }
        }
        Ok(listing)
    }

    async fn presigned_url(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        self.check()?;
        Ok(format!(
            "{}/{key}?expires={}",
            self.base_url,
            expires_in.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delimited_listing_folds_subdirectories() {
        let s = MemoryObjectStore::new();
        s.put("p/a.txt", b"a".to_vec());
        s.put("p/sub/b.txt", b"b".to_vec());
        s.put("p/sub/c.txt", b"c".to_vec());
        s.put("q/other", b"x".to_vec());

        let listing = s.list("p/", Some('/')).await.unwrap();
        assert_eq!(listing.objects.len(), 1);
        assert_eq!(listing.objects[0].key, "p/a.txt");
        assert_eq!(listing.common_prefixes, ["p/sub/"]);

        let flat = s.list("p/", None).await.unwrap();
        assert_eq!(flat.objects.len(), 3);
        assert!(flat.common_prefixes.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let s = MemoryObjectStore::new();
        assert!(s.get("nope").await.unwrap().is_none());
        assert!(s.head("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outage_is_an_error() {
        let s = MemoryObjectStore::new();
        s.put("k", b"v".to_vec());
        s.set_available(false);
        assert!(matches!(s.get("k").await, Err(StorageError::Unavailable(_))));
        s.set_available(true);
        assert_eq!(s.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
