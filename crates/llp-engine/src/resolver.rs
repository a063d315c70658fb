//! # License Digest Resolution
//!
//! Decides which license texts govern a node. Sources, first match wins:
//!
//! | # | Source                                   | Result                        |
//! |---|------------------------------------------|-------------------------------|
//! | 1 | `BUILD-INFO.txt` of the governing dir    | per-record digests or `OPEN`  |
//! | 2 | any `*OPEN-EULA.txt*`                     | `OPEN`                        |
//! | 3 | a plain `EULA.txt`                        | digest of the path's theme template |
//! | 4 | `<file>.EULA.txt.<vendor>`                | digest of the vendor template |
//! | 5 | any other `*EULA.txt*`                    | `OPEN`                        |
//! | 6 | nothing                                  | empty (deny)                  |
//!
//! Within a `BUILD-INFO.txt`, `License-Type`, `Auth-Groups` and `Theme`
//! fall back to record 0 when a record omits them (see
//! [`BuildInfoDocument::inherited`]). `License-Text` never does: each
//! record contributes only its own text. An open record anywhere in scope
//! makes the whole outcome `OPEN`, discarding digests of earlier records.
//!
//! Every digest produced is inserted into the [`LicenseStore`] before it is
//! returned, so the acceptance page can always look it up.

use std::sync::Arc;

use llp_artifact::ArtifactNode;
use llp_core::buildinfo::{LICENSE_TEXT, LICENSE_TYPE, THEME};
use llp_core::theme::{theme_for_path, DEFAULT_THEME};
use llp_core::{BuildInfoDocument, DigestOutcome, LicenseDigest};
use llp_store::{InsertOutcome, License, LicenseStore};
use serde::Serialize;

use crate::error::ResolveError;
use crate::templates::ThemeTemplates;

/// What governs one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub outcome: DigestOutcome,
    /// Groups a client must belong to, deduplicated, in declaration order.
    pub auth_groups: Vec<String>,
}

impl Resolution {
    pub fn open() -> Self {
        Self {
            outcome: DigestOutcome::Open,
            auth_groups: Vec::new(),
        }
    }

    pub fn unresolved() -> Self {
        Self {
            outcome: DigestOutcome::unresolved(),
            auth_groups: Vec::new(),
        }
    }
}

pub struct LicenseDigestResolver {
    store: Arc<dyn LicenseStore>,
    templates: ThemeTemplates,
}

impl std::fmt::Debug for LicenseDigestResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseDigestResolver")
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl LicenseDigestResolver {
    pub fn new(store: Arc<dyn LicenseStore>, templates: ThemeTemplates) -> Self {
        Self { store, templates }
    }

    pub fn store(&self) -> &Arc<dyn LicenseStore> {
        &self.store
    }

    pub fn templates(&self) -> &ThemeTemplates {
        &self.templates
    }

    pub async fn resolve(&self, node: &dyn ArtifactNode) -> Result<Resolution, ResolveError> {
        if let Some(raw) = node.build_info().await? {
            let doc = BuildInfoDocument::from_bytes(&raw);
            let scope = (!node.is_dir()).then(|| node.file_name());
            return self.from_build_info(&doc.scoped_to(scope), node).await;
        }

        let eulas = node.eulas().await?;
        let outcome = self.from_eulas(node, &eulas).await?;
        Ok(Resolution {
            outcome,
            auth_groups: Vec::new(),
        })
    }

    /// Licenses for the digests of `resolution`, in order.
    pub async fn licenses(&self, resolution: &Resolution) -> Result<Vec<License>, ResolveError> {
        Ok(self.store.get_many(resolution.outcome.digests()).await?)
    }

    async fn from_build_info(
        &self,
        doc: &BuildInfoDocument,
        node: &dyn ArtifactNode,
    ) -> Result<Resolution, ResolveError> {
        let mut auth_groups: Vec<String> = Vec::new();
        for i in 0..doc.max_index() {
            for group in doc.auth_groups(i) {
                if !auth_groups.contains(&group) {
                    auth_groups.push(group);
                }
            }
        }

        let mut digests = Vec::new();
        for i in 0..doc.max_index() {
            let license_type = doc.inherited(LICENSE_TYPE, i);
            let text = doc.get(LICENSE_TEXT, i).filter(|t| !t.is_empty());
            let record_groups = doc.auth_groups(i);

            if license_type == Some("open") || (!record_groups.is_empty() && text.is_none()) {
                return Ok(Resolution {
                    outcome: DigestOutcome::Open,
                    auth_groups,
                });
            }

            let Some(text) = text else {
                tracing::warn!(
                    url = %node.url(),
                    record = i,
                    "BUILD-INFO record has neither license text nor auth groups"
                );
                continue;
            };
            let theme = doc.inherited(THEME, i).unwrap_or(DEFAULT_THEME);
            digests.push(self.digest(text, theme).await?);
        }

        Ok(Resolution {
            outcome: DigestOutcome::Digests(digests),
            auth_groups,
        })
    }

    async fn from_eulas(
        &self,
        node: &dyn ArtifactNode,
        eulas: &[String],
    ) -> Result<DigestOutcome, ResolveError> {
        if eulas.iter().any(|n| n.contains("OPEN-EULA.txt")) {
            return Ok(DigestOutcome::Open);
        }

        if eulas.iter().any(|n| n == "EULA.txt") {
            let theme = theme_for_path(&node.url());
            return self.digest_template(theme).await;
        }

        if let Some(vendor) = per_file_vendor(node.file_name(), eulas) {
            return self.digest_template(vendor).await;
        }

        if !eulas.is_empty() {
            return Ok(DigestOutcome::Open);
        }

        Ok(DigestOutcome::unresolved())
    }

    async fn digest_template(&self, theme: &str) -> Result<DigestOutcome, ResolveError> {
        match self.templates.load(theme).await? {
            Some(text) => Ok(DigestOutcome::Digests(vec![self.digest(&text, theme).await?])),
            None => Ok(DigestOutcome::unresolved()),
        }
    }

    async fn digest(&self, text: &str, theme: &str) -> Result<LicenseDigest, ResolveError> {
        let license = License::new(text, theme);
        if self.store.insert_if_absent(&license).await? == InsertOutcome::Inserted {
            tracing::info!(digest = %license.digest, theme, "recorded new license text");
        }
        Ok(license.digest)
    }
}

/// Vendor named by a `<file_name>.EULA.txt.<vendor>` marker.
fn per_file_vendor<'a>(file_name: &str, eulas: &'a [String]) -> Option<&'a str> {
    if file_name.is_empty() {
        return None;
    }
    let marker = format!("{file_name}.EULA.txt");
    eulas
        .iter()
        .find(|n| n.contains(&marker))
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, vendor)| vendor)
}
