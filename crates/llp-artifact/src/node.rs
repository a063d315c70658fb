//! # Artifact Node Capability
//!
//! One flat trait, two implementations. Directory-scoped metadata
//! (`BUILD-INFO.txt` bytes and EULA marker names) is memoized in a
//! [`DirContext`]. A directory node owns the context for itself and hands
//! the same `Arc` to every file child it enumerates, so listing a directory
//! of N files costs one BUILD-INFO fetch, not N.
//!
//! Contexts live exactly as long as the nodes that hold them. Nothing is
//! cached process-wide: license files can change between requests.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::error::ArtifactError;
use crate::listing::{self, ListingEntry};

/// Name of the per-directory license metadata file.
pub const BUILD_INFO_FILE: &str = "BUILD-INFO.txt";

/// Substring marking legacy EULA files.
pub const EULA_MARKER: &str = "EULA.txt";

/// Lifetime of presigned object-storage download URLs.
pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(90);

/// Per-directory lazily fetched metadata.
#[derive(Default)]
pub struct DirContext {
    build_info: OnceCell<Option<Arc<[u8]>>>,
    eulas: OnceCell<Arc<[String]>>,
}

impl fmt::Debug for DirContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirContext")
            .field("build_info_loaded", &self.build_info.initialized())
            .field("eulas_loaded", &self.eulas.initialized())
            .finish()
    }
}

impl DirContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// BUILD-INFO bytes, running `fetch` only on first use.
    pub async fn build_info<F, Fut>(&self, fetch: F) -> Result<Option<Arc<[u8]>>, ArtifactError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Option<Vec<u8>>, ArtifactError>>,
    {
        let cached = self
            .build_info
            .get_or_try_init(|| async { Ok::<_, ArtifactError>(fetch().await?.map(Arc::from)) })
            .await?;
        Ok(cached.clone())
    }

    /// EULA marker names, running `fetch` only on first use.
    pub async fn eulas<F, Fut>(&self, fetch: F) -> Result<Arc<[String]>, ArtifactError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<String>, ArtifactError>>,
    {
        let cached = self
            .eulas
            .get_or_try_init(|| async {
                let mut names = fetch().await?;
                names.sort();
                Ok::<_, ArtifactError>(Arc::from(names))
            })
            .await?;
        Ok(Arc::clone(cached))
    }
}

/// How the HTTP layer should hand a file to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    /// Let the front-end web server stream `path`.
    Sendfile {
        path: PathBuf,
        file_name: String,
        mime: &'static str,
    },
    /// Redirect to a short-lived URL.
    Redirect { url: String },
}

/// Uniform handle on one file or directory.
#[async_trait]
pub trait ArtifactNode: Send + Sync + fmt::Debug {
    /// Base name; empty for the served root.
    fn file_name(&self) -> &str;

    /// URL path of the containing directory, without leading or trailing `/`.
    fn urlbase(&self) -> &str;

    fn is_dir(&self) -> bool;

    /// Size in bytes. Zero for broken links and synthetic directories.
    fn size(&self) -> u64;

    fn mtime(&self) -> Option<DateTime<Utc>>;

    /// Absolute URL path. Directories end with `/`.
    fn url(&self) -> String {
        let base = self.urlbase().trim_matches('/');
        let mut url = if base.is_empty() {
            "/".to_string()
        } else {
            format!("/{base}/")
        };
        url.push_str(self.file_name());
        if self.is_dir() && !url.ends_with('/') {
            url.push('/');
        }
        url
    }

    /// URL path of the directory that governs this node's licensing.
    fn dir_url(&self) -> String {
        if self.is_dir() {
            self.url()
        } else {
            let base = self.urlbase().trim_matches('/');
            if base.is_empty() {
                "/".to_string()
            } else {
                format!("/{base}/")
            }
        }
    }

    fn hidden(&self) -> bool {
        listing::is_hidden(self.file_name())
    }

    fn mime_type(&self) -> Option<&'static str> {
        if self.is_dir() {
            None
        } else {
            listing::mime_for_name(self.file_name())
        }
    }

    fn listing_entry(&self, human_readable: bool) -> ListingEntry {
        ListingEntry::for_node(self, human_readable)
    }

    /// Canonical URL path: symlinks resolved on disk, `.s3_linked_from`
    /// origin metadata in object storage.
    async fn real_name(&self) -> Result<String, ArtifactError>;

    /// Read a plain file named `name` from the governing directory.
    ///
    /// `name` must be a single path component. Missing, non-regular and
    /// symlinked files read as `None`.
    async fn read_child(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError>;

    /// Raw `BUILD-INFO.txt` of the governing directory, fetched once per
    /// directory context.
    async fn build_info(&self) -> Result<Option<Arc<[u8]>>, ArtifactError>;

    /// Names of `*EULA.txt*` files in the governing directory, sorted,
    /// fetched once per directory context.
    async fn eulas(&self) -> Result<Arc<[String]>, ArtifactError>;

    /// Visible children in listing order. Errors on files.
    async fn enumerate_children(&self) -> Result<Vec<Box<dyn ArtifactNode>>, ArtifactError>;

    async fn download(&self) -> Result<Download, ArtifactError>;
}

/// Reject anything but a single plain path component.
pub(crate) fn validate_child_name(name: &str) -> Result<(), ArtifactError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    Ok(())
}
