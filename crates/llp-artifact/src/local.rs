//! # Filesystem Backend
//!
//! A [`LocalArtifact`] is a path relative to one served root directory.
//! Metadata follows symlinks; a dangling symlink is a zero-size file with
//! no modification time rather than an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::error::ArtifactError;
use crate::listing::{is_hidden, listing_order, mime_for_name};
use crate::node::{
    validate_child_name, ArtifactNode, DirContext, Download, BUILD_INFO_FILE, EULA_MARKER,
};

#[derive(Debug)]
pub struct LocalArtifact {
    root: PathBuf,
    rel: String,
    urlbase: String,
    file_name: String,
    full_path: PathBuf,
    is_dir: bool,
    size: u64,
    mtime: Option<DateTime<Utc>>,
    context: Arc<DirContext>,
}

impl LocalArtifact {
    /// Open `rel` (slash-separated, relative) under `root`.
    ///
    /// `rel` is trusted here; untrusted request paths go through
    /// [`crate::safe_path_join`] first.
    pub async fn open(root: impl Into<PathBuf>, rel: &str) -> Result<Self, ArtifactError> {
        Self::open_with_context(root.into(), rel, None).await
    }

    async fn open_with_context(
        root: PathBuf,
        rel: &str,
        parent_context: Option<Arc<DirContext>>,
    ) -> Result<Self, ArtifactError> {
        let rel = rel.trim_matches('/').to_string();
        let full_path = if rel.is_empty() {
            root.clone()
        } else {
            root.join(&rel)
        };

        let (is_dir, size, mtime) = match fs::metadata(&full_path).await {
            Ok(meta) => (
                meta.is_dir(),
                meta.len(),
                meta.modified().ok().map(DateTime::<Utc>::from),
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match fs::symlink_metadata(&full_path).await {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        tracing::debug!(path = %full_path.display(), "dangling symlink");
                        (false, 0, None)
                    }
                    _ => return Err(ArtifactError::NotFound(format!("/{rel}"))),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let (urlbase, file_name) = match rel.rsplit_once('/') {
            Some((base, name)) => (base.to_string(), name.to_string()),
            None => (String::new(), rel.clone()),
        };

        let context = match parent_context {
            Some(ctx) if !is_dir => ctx,
            _ => DirContext::new(),
        };

        Ok(Self {
            root,
            rel,
            urlbase,
            file_name,
            full_path,
            is_dir,
            size,
            mtime,
            context,
        })
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn governing_dir(&self) -> &Path {
        if self.is_dir {
            &self.full_path
        } else {
            self.full_path.parent().unwrap_or(self.root.as_path())
        }
    }

    async fn read_dir_names(dir: &Path) -> Result<Vec<String>, ArtifactError> {
        let mut rd = fs::read_dir(dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

#[async_trait]
impl ArtifactNode for LocalArtifact {
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
        let target = match fs::canonicalize(&self.full_path).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(self.url()));
            }
            Err(e) => return Err(e.into()),
        };
        let root = fs::canonicalize(&self.root).await?;
        let rel = target
            .strip_prefix(&root)
            .map_err(|_| ArtifactError::OutsideRoot(self.url()))?;

        let mut name = format!("/{}", rel.to_string_lossy());
        if self.is_dir && !name.ends_with('/') {
            name.push('/');
        }
        Ok(name)
    }

    async fn read_child(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        validate_child_name(name)?;
        let path = self.governing_dir().join(name);
        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.file_type().is_file() => Ok(Some(fs::read(&path).await?)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn build_info(&self) -> Result<Option<Arc<[u8]>>, ArtifactError> {
        let path = self.governing_dir().join(BUILD_INFO_FILE);
        self.context
            .build_info(|| async move {
                match fs::read(&path).await {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    async fn eulas(&self) -> Result<Arc<[String]>, ArtifactError> {
        let dir = self.governing_dir().to_path_buf();
        self.context
            .eulas(|| async move {
                let names = Self::read_dir_names(&dir).await?;
                Ok(names
                    .into_iter()
                    .filter(|n| n.contains(EULA_MARKER))
                    .collect())
            })
            .await
    }

    async fn enumerate_children(&self) -> Result<Vec<Box<dyn ArtifactNode>>, ArtifactError> {
        if !self.is_dir {
            return Err(ArtifactError::NotADirectory(self.url()));
        }
        let mut names = Self::read_dir_names(&self.full_path).await?;
        names.retain(|n| !is_hidden(n));
        names.sort_by(|a, b| listing_order(a, b));

        let mut children: Vec<Box<dyn ArtifactNode>> = Vec::with_capacity(names.len());
        for name in names {
            let rel = if self.rel.is_empty() {
                name
            } else {
                format!("{}/{name}", self.rel)
            };
            match Self::open_with_context(self.root.clone(), &rel, Some(Arc::clone(&self.context)))
                .await
            {
                Ok(child) => children.push(Box::new(child)),
                // Removed between read_dir and stat.
                Err(ArtifactError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(children)
    }

    async fn download(&self) -> Result<Download, ArtifactError> {
        if self.is_dir {
            return Err(ArtifactError::IsADirectory(self.url()));
        }
        Ok(Download::Sendfile {
            path: self.full_path.clone(),
            file_name: self.file_name.clone(),
            mime: mime_for_name(&self.file_name).unwrap_or("application/force-download"),
        })
    }
}
