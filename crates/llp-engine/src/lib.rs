//! # llp-engine: License Resolution and Access Decisions
//!
//! Turns an [`ArtifactNode`](llp_artifact::ArtifactNode) into a verdict.
//!
//! ```text
//! node ──► LicenseDigestResolver ──► Resolution { outcome, auth_groups }
//!                                          │
//! ClientContext ───────────────────► AccessPolicy ──► AccessVerdict
//!                                          │
//!                                 GroupAuthProvider chain
//! ```
//!
//! ## Modules
//!
//! | Module         | Purpose                                                  |
//! |----------------|----------------------------------------------------------|
//! | [`resolver`]   | BUILD-INFO and legacy EULA resolution to digests or OPEN |
//! | [`templates`]  | canned per-theme license texts                           |
//! | [`context`]    | what the engine knows about the requesting client        |
//! | [`group_auth`] | `session`, `directory` and `crowd` group providers       |
//! | [`access`]     | trust rules and the ordered access decision              |
//! | [`listing`]    | directory listings annotated with license digests       |
//!
//! The resolver never decides access and the policy never touches storage;
//! the HTTP layer wires them together per request.

pub mod access;
pub mod context;
pub mod error;
pub mod group_auth;
pub mod listing;
pub mod resolver;
pub mod templates;

pub use access::{AccessPolicy, AccessVerdict, TrustRules};
pub use context::{ClientContext, RemoteUser};
pub use error::{GroupAuthError, ResolveError};
pub use group_auth::{
    CrowdConfig, CrowdGroupProvider, DirectoryGroupProvider, GroupAuthProvider, GroupAuthVerdict,
    SessionGroupProvider,
};
pub use listing::{dir_list, LicensedEntry, ListedDigests};
pub use resolver::{LicenseDigestResolver, Resolution};
pub use templates::ThemeTemplates;
