//! # Object-Storage Backend
//!
//! Objects live under a key prefix in a flat namespace. Directories are
//! synthetic: a "directory" is a key prefix ending in `/` that at least one
//! object shares. Every store call is network I/O and is bounded by the
//! [`ObjectRoot`] timeout.
//!
//! Keys are built as `<prefix><relative path>`; a directory's own prefix
//! is `<prefix><relative path>/` (or just `<prefix>` for the root).

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ArtifactError, StorageError};
use crate::listing::{is_hidden, listing_order};
use crate::node::{
    validate_child_name, ArtifactNode, DirContext, Download, BUILD_INFO_FILE, EULA_MARKER,
    PRESIGNED_URL_TTL,
};

/// Marker file recording where a published tree was linked from.
pub const LINKED_FROM_FILE: &str = ".s3_linked_from";

/// Metadata of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Result of a delimited listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    pub objects: Vec<ObjectMeta>,
    /// Full prefixes ending in the delimiter, e.g. `builds/10/`.
    pub common_prefixes: Vec<String>,
}

/// The object-storage client the portal consumes.
///
/// Missing keys are `Ok(None)`; every other failure is a [`StorageError`].
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError>;

    /// Objects under `prefix`. With a delimiter, keys containing it past
    /// the prefix are folded into `common_prefixes`.
    async fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<ObjectListing, StorageError>;

    async fn presigned_url(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;
}

/// A store, the key prefix under which the portal's tree lives, and the
/// per-call timeout.
#[derive(Clone)]
pub struct ObjectRoot {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    timeout: Duration,
}

impl fmt::Debug for ObjectRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRoot")
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ObjectRoot {
    /// `prefix` is normalized to end in `/` unless empty.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>, timeout: Duration) -> Self {
        let mut prefix: String = prefix.into().trim_start_matches('/').to_string();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self {
            store,
            prefix,
            timeout,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub(crate) fn key_for(&self, rel: &str) -> String {
        format!("{}{rel}", self.prefix)
    }

    pub(crate) fn dir_prefix_for(&self, rel: &str) -> String {
        if rel.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}{rel}/", self.prefix)
        }
    }

    /// Run a store call under the configured timeout.
    pub(crate) async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, prefix = %self.prefix, "object store call timed out");
                Err(StorageError::Timeout {
                    operation,
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

#[derive(Debug)]
pub struct ObjectArtifact {
    root: ObjectRoot,
    rel: String,
    urlbase: String,
    file_name: String,
    is_dir: bool,
    size: u64,
    mtime: Option<DateTime<Utc>>,
    context: Arc<DirContext>,
}

impl ObjectArtifact {
    /// A file node from object metadata.
    pub fn file(root: ObjectRoot, meta: &ObjectMeta, parent_context: Option<Arc<DirContext>>) -> Self {
        let rel = meta
            .key
            .strip_prefix(root.prefix())
            .unwrap_or(&meta.key)
            .to_string();
        let (urlbase, file_name) = split_rel(&rel);
        Self {
            root,
            rel,
            urlbase,
            file_name,
            is_dir: false,
            size: meta.size,
            mtime: Some(meta.last_modified),
            context: parent_context.unwrap_or_else(DirContext::new),
        }
    }

    /// A synthetic directory node for `rel` (no leading or trailing `/`).
    pub fn directory(root: ObjectRoot, rel: &str) -> Self {
        let rel = rel.trim_matches('/').to_string();
        let (urlbase, file_name) = split_rel(&rel);
        Self {
            root,
            rel,
            urlbase,
            file_name,
            is_dir: true,
            size: 0,
            mtime: None,
            context: DirContext::new(),
        }
    }

    pub fn key(&self) -> String {
        self.root.key_for(&self.rel)
    }

    fn governing_prefix(&self) -> String {
        if self.is_dir {
            self.root.dir_prefix_for(&self.rel)
        } else {
            match self.rel.rsplit_once('/') {
                Some((dir, _)) => self.root.dir_prefix_for(dir),
                None => self.root.dir_prefix_for(""),
            }
        }
    }
}

fn split_rel(rel: &str) -> (String, String) {
    match rel.rsplit_once('/') {
        Some((base, name)) => (base.to_string(), name.to_string()),
        None => (String::new(), rel.to_string()),
    }
}

#[async_trait]
impl ArtifactNode for ObjectArtifact {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn urlbase(&self) -> &str {
        &self.urlbase
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mtime(&self) -> Option<DateTime<Utc>> {
        self.mtime
    }

    async fn real_name(&self) -> Result<String, ArtifactError> {
        let url = self.url();
        let Some(raw) = self.read_child(LINKED_FROM_FILE).await? else {
            return Ok(url);
        };
        let linked = String::from_utf8_lossy(&raw).trim().to_string();
        if linked.is_empty() {
            return Ok(url);
        }
        let origin = match linked.strip_prefix(self.root.prefix()) {
            Some(rest) => format!("/{rest}"),
            None => format!("/{}", linked.trim_start_matches('/')),
        };
        let origin = origin.trim_end_matches('/');
        Ok(if self.is_dir {
            format!("{origin}/")
        } else {
            format!("{origin}/{}", self.file_name)
        })
    }

    async fn read_child(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        validate_child_name(name)?;
        let key = format!("{}{name}", self.governing_prefix());
        Ok(self.root.bounded("get", self.root.store.get(&key)).await?)
    }

    async fn build_info(&self) -> Result<Option<Arc<[u8]>>, ArtifactError> {
        let key = format!("{}{BUILD_INFO_FILE}", self.governing_prefix());
        let root = self.root.clone();
        self.context
            .build_info(|| async move { Ok(root.bounded("get", root.store.get(&key)).await?) })
            .await
    }

    async fn eulas(&self) -> Result<Arc<[String]>, ArtifactError> {
        let prefix = self.governing_prefix();
        let root = self.root.clone();
        self.context
            .eulas(|| async move {
                let listing = root.bounded("list", root.store.list(&prefix, Some('/'))).await?;
                Ok(listing
                    .objects
                    .into_iter()
                    .filter_map(|o| {
                        let name = o.key.rsplit('/').next().unwrap_or(&o.key).to_string();
                        name.contains(EULA_MARKER).then_some(name)
                    })
                    .collect())
            })
            .await
    }

    async fn enumerate_children(&self) -> Result<Vec<Box<dyn ArtifactNode>>, ArtifactError> {
        if !self.is_dir {
            return Err(ArtifactError::NotADirectory(self.url()));
        }
        let prefix = self.root.dir_prefix_for(&self.rel);
        let listing = self
            .root
            .bounded("list", self.root.store.list(&prefix, Some('/')))
            .await?;

        let mut children: Vec<Box<dyn ArtifactNode>> = Vec::new();
        for meta in &listing.objects {
            if meta.key == prefix {
                continue;
            }
            let node = Self::file(self.root.clone(), meta, Some(Arc::clone(&self.context)));
            if !is_hidden(&node.file_name) {
                children.push(Box::new(node));
            }
        }
        for common in &listing.common_prefixes {
            let rel = common
                .strip_prefix(self.root.prefix())
                .unwrap_or(common)
                .trim_end_matches('/');
            let node = Self::directory(self.root.clone(), rel);
            if !is_hidden(&node.file_name) {
                children.push(Box::new(node));
            }
        }
        children.sort_by(|a, b| listing_order(a.file_name(), b.file_name()));
        Ok(children)
    }

    async fn download(&self) -> Result<Download, ArtifactError> {
        if self.is_dir {
            return Err(ArtifactError::IsADirectory(self.url()));
        }
        let key = self.key();
        let url = self
            .root
            .bounded(
                "presign",
                self.root.store.presigned_url(&key, PRESIGNED_URL_TTL),
            )
            .await?;
        Ok(Download::Redirect { url })
    }
}
