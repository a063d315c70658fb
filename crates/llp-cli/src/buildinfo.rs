//! # `llp buildinfo`
//!
//! Parses a `BUILD-INFO.txt` and prints its records. With `--file-name`
//! only the records whose `Files-Pattern` governs that file are kept,
//! exactly as the resolver would see them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use llp_core::BuildInfoDocument;
use serde_json::{json, Value};

use crate::print_json;

#[derive(Args, Debug)]
pub struct BuildinfoArgs {
    /// Path to a BUILD-INFO.txt file.
    pub file: PathBuf,

    /// Only show records governing this file name.
    #[arg(long)]
    pub file_name: Option<String>,
}

/// The parsed document as JSON.
pub fn inspect(args: &BuildinfoArgs) -> Result<Value> {
    let raw = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let doc = BuildInfoDocument::from_bytes(&raw).scoped_to(args.file_name.as_deref());
    tracing::debug!(records = doc.records().len(), "parsed BUILD-INFO");

    let auth_groups: Vec<String> = (0..doc.records().len())
        .flat_map(|i| doc.auth_groups(i))
        .fold(Vec::new(), |mut acc, g| {
            if !acc.contains(&g) {
                acc.push(g);
            }
            acc
        });

    Ok(json!({
        "file": args.file.display().to_string(),
        "format_version": doc.format_version(),
        "auth_groups": auth_groups,
        "records": doc.records(),
    }))
}

pub fn run_buildinfo(args: &BuildinfoArgs) -> Result<u8> {
    print_json(&inspect(args)?)?;
    Ok(0)
}
