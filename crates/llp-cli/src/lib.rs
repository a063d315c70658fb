//! # llp-cli: Operator CLI for the Download Portal
//!
//! Answers "what governs this file?" without running the server.
//!
//! ## Subcommands
//!
//! - `llp buildinfo`: parse a `BUILD-INFO.txt` and print its records.
//! - `llp resolve`: resolve the licenses governing a path under a served root.
//! - `llp ls`: list a directory with per-file license digests.
//!
//! Every subcommand prints JSON on stdout. Licenses discovered while
//! resolving live in an in-memory store for the duration of the command.
//!
//! ```bash
//! llp buildinfo /srv/releases/android/BUILD-INFO.txt --file-name boot.img
//! llp resolve --root /srv/releases android/latest/boot.img
//! llp ls --root /srv/releases --human android/latest
//! ```

pub mod buildinfo;
pub mod resolve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use llp_engine::{LicenseDigestResolver, ThemeTemplates};
use llp_store::MemoryLicenseStore;

/// Where the per-theme license templates live unless `--templates` is given.
pub const DEFAULT_TEMPLATES_DIR: &str = "templates/licenses";

/// Single-threaded runtime for the async engine calls.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// A resolver backed by a fresh in-memory License store.
pub fn memory_resolver(templates: Option<PathBuf>) -> LicenseDigestResolver {
    let templates = templates.unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR));
    LicenseDigestResolver::new(
        Arc::new(MemoryLicenseStore::new()),
        ThemeTemplates::new(templates),
    )
}

/// Print `value` as pretty JSON.
pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_defaults_templates_dir() {
        let r = memory_resolver(None);
        assert_eq!(r.templates().dir(), std::path::Path::new(DEFAULT_TEMPLATES_DIR));
    }

    #[test]
    fn runtime_runs_futures() {
        let rt = runtime().unwrap();
        assert_eq!(rt.block_on(async { 7 }), 7);
    }
}
