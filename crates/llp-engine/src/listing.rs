//! # Licensed Directory Listing
//!
//! A directory listing where every file row carries the digests that
//! govern it and the matching license texts. Subdirectories carry an empty
//! digest list. A file whose resolution fails is listed with `"INVALID"`
//! instead of failing the whole listing.

use llp_artifact::{ArtifactNode, ListingEntry};
use llp_core::DigestOutcome;
use llp_store::License;
use serde::{Serialize, Serializer};

use crate::error::ResolveError;
use crate::resolver::LicenseDigestResolver;

/// Digests of one listed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListedDigests {
    Resolved(DigestOutcome),
    Invalid,
}

impl Serialize for ListedDigests {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Resolved(outcome) => outcome.serialize(serializer),
            Self::Invalid => serializer.serialize_str("INVALID"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LicensedEntry {
    #[serde(flatten)]
    pub entry: ListingEntry,
    pub license_digest_list: ListedDigests,
    pub license_list: Vec<License>,
}

/// List the visible children of `dir`, in listing order.
pub async fn dir_list(
    resolver: &LicenseDigestResolver,
    dir: &dyn ArtifactNode,
    human_readable: bool,
) -> Result<Vec<LicensedEntry>, ResolveError> {
    let children = dir.enumerate_children().await?;
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let digests = if child.is_dir() {
            ListedDigests::Resolved(DigestOutcome::unresolved())
        } else {
            match resolver.resolve(child.as_ref()).await {
                Ok(r) => ListedDigests::Resolved(r.outcome),
                Err(e) => {
                    tracing::warn!(url = %child.url(), error = %e, "license resolution failed while listing");
                    ListedDigests::Invalid
                }
            }
        };
        let license_list = match &digests {
            ListedDigests::Resolved(outcome) => resolver.store().get_many(outcome.digests()).await?,
            ListedDigests::Invalid => Vec::new(),
        };
        out.push(LicensedEntry {
            entry: child.listing_entry(human_readable),
            license_digest_list: digests,
            license_list,
        });
    }
    Ok(out)
}
