//! # Directory Listing Rules
//!
//! Ordering, visibility and display formatting shared by both backends.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

use crate::node::ArtifactNode;

/// Names containing any of these are never listed and never served.
pub const HIDDEN_SUBSTRINGS: &[&str] = &[
    "BUILD-INFO.txt",
    "EULA.txt",
    "HEADER.html",
    "HEADER.textile",
    "HOWTO_",
    "textile",
    ".htaccess",
    "licenses",
    ".s3_linked_from",
];

pub fn is_hidden(name: &str) -> bool {
    HIDDEN_SUBSTRINGS.iter().any(|s| name.contains(s))
}

/// Listing order: `latest` first, then integer names numerically, then
/// everything else as plain strings.
///
/// Integers sort ahead of other names so the order stays total when a
/// directory mixes build numbers and named entries.
pub fn listing_order(a: &str, b: &str) -> Ordering {
    match (a == "latest", b == "latest") {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// `1`, `1.2K`, `1.2M`, `1.1G`, `1.1T`.
pub fn human_size(num: u64) -> String {
    if num < 1024 {
        return num.to_string();
    }
    let mut n = num as f64 / 1024.0;
    for unit in ["K", "M", "G"] {
        if n < 1024.0 {
            return format!("{n:.1}{unit}");
        }
        n /= 1024.0;
    }
    format!("{n:.1}T")
}

const MIME_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xml", "text/xml"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("gz", "application/gzip"),
    ("tgz", "application/gzip"),
    ("bz2", "application/x-bzip2"),
    ("xz", "application/x-xz"),
    ("tar", "application/x-tar"),
    ("zip", "application/zip"),
    ("img", "application/octet-stream"),
    ("bin", "application/octet-stream"),
    ("iso", "application/x-iso9660-image"),
    ("deb", "application/vnd.debian.binary-package"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
];

/// MIME type guessed from the extension.
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, m)| *m)
}

/// One row of a directory listing.
///
/// With `human_readable`, `size` is a string like `1.2M` and `mtime` is
/// `17-Oct-2026 09:30`; otherwise they are bytes and Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    pub size: Value,
    pub mtime: Value,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub url: String,
}

impl ListingEntry {
    pub fn for_node<N: ArtifactNode + ?Sized>(node: &N, human_readable: bool) -> Self {
        let entry_type = if node.is_dir() {
            Some("folder".to_string())
        } else {
            match (node.mime_type(), human_readable) {
                (None, true) => Some("other".to_string()),
                (Some(m), true) if m.starts_with("text/") => Some("text".to_string()),
                (m, _) => m.map(str::to_string),
            }
        };

        let (size, mtime) = if human_readable {
            (
                Value::from(human_size(node.size())),
                node.mtime()
                    .map(|t| Value::from(t.format("%d-%b-%Y %H:%M").to_string()))
                    .unwrap_or_else(|| Value::from("-")),
            )
        } else {
            (
                Value::from(node.size()),
                node.mtime()
                    .map(|t| Value::from(t.timestamp()))
                    .unwrap_or(Value::Null),
            )
        };

        Self {
            name: node.file_name().to_string(),
            size,
            mtime,
            entry_type,
            url: node.url(),
        }
    }
}
