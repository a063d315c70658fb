//! # `llp resolve` and `llp ls`
//!
//! Run the resolver against a local served root. Both commands look the
//! path up the way the file server does, so hidden names, `..` segments
//! and wildcard matches behave identically.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use llp_artifact::{find_local_artifact, ArtifactNode};
use llp_engine::{dir_list, LicenseDigestResolver};
use serde_json::{json, Value};

use crate::{memory_resolver, print_json, runtime};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Served root directory.
    #[arg(long)]
    pub root: PathBuf,

    /// Directory of per-theme license templates.
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Path below the root, as it would appear in a URL.
    pub path: String,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Served root directory.
    #[arg(long)]
    pub root: PathBuf,

    /// Directory of per-theme license templates.
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Human-readable sizes and dates.
    #[arg(long)]
    pub human: bool,

    /// Directory below the root. Defaults to the root itself.
    #[arg(default_value = "")]
    pub path: String,
}

async fn locate(roots: &[PathBuf], path: &str) -> Result<Box<dyn ArtifactNode>> {
    if path.split('/').any(llp_artifact::is_hidden) {
        bail!("no such artifact: /{path}");
    }
    match find_local_artifact(roots, path).await? {
        Some(node) if !node.hidden() => Ok(Box::new(node)),
        _ => bail!("no such artifact: /{path}"),
    }
}

/// Digests, auth groups and license texts governing `args.path`.
pub async fn resolve(resolver: &LicenseDigestResolver, args: &ResolveArgs) -> Result<Value> {
    let node = locate(std::slice::from_ref(&args.root), &args.path).await?;
    let resolution = resolver.resolve(node.as_ref()).await?;
    let licenses = resolver.licenses(&resolution).await?;
    tracing::info!(url = %node.url(), outcome = ?resolution.outcome, "resolved");
    Ok(json!({
        "url": node.url(),
        "license_digest_list": resolution.outcome,
        "auth_groups": resolution.auth_groups,
        "licenses": licenses,
    }))
}

/// Listing of the directory at `args.path`.
pub async fn ls(resolver: &LicenseDigestResolver, args: &LsArgs) -> Result<Value> {
    let node = locate(std::slice::from_ref(&args.root), &args.path).await?;
    if !node.is_dir() {
        bail!("not a directory: {}", node.url());
    }
    let files = dir_list(resolver, node.as_ref(), args.human).await?;
    Ok(json!({ "path": node.url(), "files": files }))
}

pub fn run_resolve(args: &ResolveArgs) -> Result<u8> {
    let resolver = memory_resolver(args.templates.clone());
    let out = runtime()?.block_on(resolve(&resolver, args))?;
    print_json(&out)?;
    Ok(0)
}

pub fn run_ls(args: &LsArgs) -> Result<u8> {
    let resolver = memory_resolver(args.templates.clone());
    let out = runtime()?.block_on(ls(&resolver, args))?;
    print_json(&out)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use llp_core::LicenseDigest;
    use tempfile::TempDir;

    struct Tree {
        root: TempDir,
        templates: TempDir,
    }

    impl Tree {
        fn new() -> Self {
            let t = Self {
                root: TempDir::new().unwrap(),
                templates: TempDir::new().unwrap(),
            };
            std::fs::write(t.templates.path().join("linaro.txt"), "Linaro license text\n").unwrap();
            t.write(
                "builds/BUILD-INFO.txt",
                "Format-Version: 0.5\nFiles-Pattern: *\nLicense-Type: protected\nLicense-Text: Sample text\n",
            );
            t.write("builds/rootfs.img", "x");
            t.write("builds/10/boot.img", "x");
            t.write("legacy/EULA.txt", "");
            t.write("legacy/a.img", "x");
            t
        }

        fn write(&self, rel: &str, body: &str) {
            let p = self.root.path().join(rel);
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(p, body).unwrap();
        }

        fn resolver(&self) -> LicenseDigestResolver {
            memory_resolver(Some(self.templates.path().to_path_buf()))
        }

        fn resolve_args(&self, path: &str) -> ResolveArgs {
            ResolveArgs {
                root: self.root.path().to_path_buf(),
                templates: Some(self.templates.path().to_path_buf()),
                path: path.to_string(),
            }
        }

        fn ls_args(&self, path: &str) -> LsArgs {
            LsArgs {
                root: self.root.path().to_path_buf(),
                templates: Some(self.templates.path().to_path_buf()),
                human: false,
                path: path.to_string(),
            }
        }
    }

    #[tokio::test]
    async fn resolve_reports_stored_license() {
        let t = Tree::new();
        let out = resolve(&t.resolver(), &t.resolve_args("builds/rootfs.img"))
            .await
            .unwrap();
        let sample = LicenseDigest::of_text("Sample text");
        assert_eq!(out["url"], "/builds/rootfs.img");
        assert_eq!(out["license_digest_list"], json!([sample.as_str()]));
        assert_eq!(out["licenses"][0]["text"], "Sample text");
    }

    #[tokio::test]
    async fn resolve_legacy_eula_uses_template() {
        let t = Tree::new();
        let out = resolve(&t.resolver(), &t.resolve_args("legacy/a.img"))
            .await
            .unwrap();
        let linaro = LicenseDigest::of_text("Linaro license text\n");
        assert_eq!(out["license_digest_list"], json!([linaro.as_str()]));
        assert_eq!(out["licenses"][0]["theme"], "linaro");
    }

    #[tokio::test]
    async fn resolve_rejects_hidden_and_missing() {
        let t = Tree::new();
        let r = t.resolver();
        assert!(resolve(&r, &t.resolve_args("builds/BUILD-INFO.txt")).await.is_err());
        assert!(resolve(&r, &t.resolve_args("nope.img")).await.is_err());
        assert!(resolve(&r, &t.resolve_args("../etc/passwd")).await.is_err());
        assert!(resolve(&r, &t.resolve_args("builds/BUILD-INFO.tx?")).await.is_err());
    }

    #[tokio::test]
    async fn ls_lists_children_with_digests() {
        let t = Tree::new();
        let out = ls(&t.resolver(), &t.ls_args("builds")).await.unwrap();
        let files = out["files"].as_array().unwrap();
        let names: Vec<&str> = files.iter().map(|f| f["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["10", "rootfs.img"]);
        assert_eq!(files[0]["license_digest_list"], json!([]));
        assert_eq!(
            files[1]["license_digest_list"],
            json!([LicenseDigest::of_text("Sample text").as_str()])
        );
    }

    #[tokio::test]
    async fn ls_of_a_file_is_an_error() {
        let t = Tree::new();
        assert!(ls(&t.resolver(), &t.ls_args("builds/rootfs.img")).await.is_err());
    }

    #[test]
    fn run_commands_succeed() {
        let t = Tree::new();
        assert_eq!(run_resolve(&t.resolve_args("builds/rootfs.img")).unwrap(), 0);
        assert_eq!(run_ls(&t.ls_args("")).unwrap(), 0);
    }
}
