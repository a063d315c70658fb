//! # llp-artifact: Files and Directories on Two Backends
//!
//! An [`ArtifactNode`] is a handle on exactly one published path. Two
//! implementations sit behind the one trait:
//!
//! - [`LocalArtifact`]: a path under a served directory on the local
//!   filesystem, downloaded through an `X-Sendfile` hand-off.
//! - [`ObjectArtifact`]: a key (or synthetic key-prefix "directory") in an
//!   [`ObjectStore`], downloaded through a short-lived presigned URL.
//!
//! Nodes expose metadata, child reads and child enumeration. License policy
//! lives in `llp-engine`; nodes only supply the raw `BUILD-INFO.txt` bytes
//! and the names of legacy EULA marker files, both fetched at most once per
//! directory and shared with every file in it through a [`DirContext`].
//!
//! ## Modules
//!
//! | Module          | Purpose                                        |
//! |-----------------|------------------------------------------------|
//! | [`node`]        | `ArtifactNode` trait, `DirContext`, `Download` |
//! | [`listing`]     | ordering, hidden names, human-readable fields  |
//! | [`local`]       | filesystem backend                             |
//! | [`object`]      | object-storage backend over [`ObjectStore`]    |
//! | [`memory`]      | in-memory [`ObjectStore`]                      |
//! | [`path`]        | `safe_path_join` and artifact lookup           |

pub mod error;
pub mod listing;
pub mod local;
pub mod memory;
pub mod node;
pub mod object;
pub mod path;

pub use error::{ArtifactError, StorageError};
pub use listing::{is_hidden, listing_order, ListingEntry};
pub use local::LocalArtifact;
pub use memory::MemoryObjectStore;
pub use node::{ArtifactNode, DirContext, Download, BUILD_INFO_FILE};
pub use object::{ObjectArtifact, ObjectListing, ObjectMeta, ObjectRoot, ObjectStore};
pub use path::{find_local_artifact, find_object_artifact, safe_path_join};
