//! # Request Path Resolution
//!
//! Maps an untrusted request path onto an artifact without escaping the
//! served directory.
//!
//! ## `safe_path_join` rules
//!
//! - One leading and one trailing `/` are ignored.
//! - `""` and `"/"` are the base directory itself and are accepted.
//! - Any empty, `.` or `..` segment rejects the whole path, as does a
//!   backslash or NUL. Nothing is normalized: a path is accepted only if
//!   it is already in canonical form.
//! - Symlinks are not resolved here. Links inside a served tree are
//!   publisher-controlled and are followed when the file is opened.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::ArtifactError;
use crate::listing::is_hidden;
use crate::local::LocalArtifact;
use crate::object::{ObjectArtifact, ObjectRoot};

/// Canonical relative form of `target`, or `None` if it is not canonical.
pub(crate) fn canonical_relative(target: &str) -> Option<String> {
    let trimmed = target.strip_prefix('/').unwrap_or(target);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return (target.len() <= 1).then(String::new);
    }
    let ok = trimmed.split('/').all(|seg| {
        !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\') && !seg.contains('\0')
    });
    ok.then(|| trimmed.to_string())
}

/// Join `target` onto `base`, refusing anything that could leave `base`.
pub fn safe_path_join(base: &Path, target: &str) -> Option<PathBuf> {
    let rel = canonical_relative(target)?;
    if rel.is_empty() {
        Some(base.to_path_buf())
    } else {
        Some(base.join(rel))
    }
}

fn has_glob_meta(name: &str) -> bool {
    name.contains(['*', '?', '['])
}

/// Find `path` under the first served directory that has it.
///
/// When nothing matches literally and the last segment contains glob
/// characters, it is matched against the entries of its directory. A
/// single match is served; several are [`ArtifactError::AmbiguousWildcard`].
pub async fn find_local_artifact(
    served_paths: &[PathBuf],
    path: &str,
) -> Result<Option<LocalArtifact>, ArtifactError> {
    let Some(rel) = canonical_relative(path) else {
        tracing::debug!(path, "rejected non-canonical request path");
        return Ok(None);
    };

    for base in served_paths {
        let full = if rel.is_empty() {
            base.clone()
        } else {
            base.join(&rel)
        };
        if fs::metadata(&full).await.is_ok() {
            return LocalArtifact::open(base.clone(), &rel).await.map(Some);
        }

        if let Some(matched) = match_wildcard(base, &rel).await? {
            return LocalArtifact::open(base.clone(), &matched).await.map(Some);
        }
    }
    Ok(None)
}

async fn match_wildcard(base: &Path, rel: &str) -> Result<Option<String>, ArtifactError> {
    let (dir_rel, pattern) = match rel.rsplit_once('/') {
        Some((d, p)) => (d, p),
        None => ("", rel),
    };
    if !has_glob_meta(pattern) {
        return Ok(None);
    }
    let Ok(glob) = glob::Pattern::new(pattern) else {
        return Ok(None);
    };
    let dir = if dir_rel.is_empty() {
        base.to_path_buf()
    } else {
        base.join(dir_rel)
    };
    if !fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Ok(None);
    }
    let mut rd = match fs::read_dir(&dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut found: Option<String> = None;
    while let Some(entry) = rd.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) || !glob.matches(&name) {
            continue;
        }
        if found.is_some() {
            return Err(ArtifactError::AmbiguousWildcard(format!("/{rel}")));
        }
        found = Some(if dir_rel.is_empty() {
            name
        } else {
            format!("{dir_rel}/{name}")
        });
    }
    Ok(found)
}

/// Find `path` in object storage: an object, a non-empty key prefix, or
/// the root.
pub async fn find_object_artifact(
    root: &ObjectRoot,
    path: &str,
) -> Result<Option<ObjectArtifact>, ArtifactError> {
    let Some(rel) = canonical_relative(path) else {
        return Ok(None);
    };
    if rel.is_empty() {
        return Ok(Some(ObjectArtifact::directory(root.clone(), "")));
    }

    let key = root.key_for(&rel);
    if let Some(meta) = root.bounded("head", root.store().head(&key)).await? {
        return Ok(Some(ObjectArtifact::file(root.clone(), &meta, None)));
    }

    let prefix = root.dir_prefix_for(&rel);
    let listing = root.bounded("list", root.store().list(&prefix, Some('/'))).await?;
    if listing.objects.is_empty() && listing.common_prefixes.is_empty() {
        return Ok(None);
    }
    Ok(Some(ObjectArtifact::directory(root.clone(), &rel)))
}
