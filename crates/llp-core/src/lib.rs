//! # llp-core: Foundational Types for the Download Portal
//!
//! Leaf crate of the workspace. Defines the types every other crate agrees
//! on when it talks about licenses:
//!
//! - [`LicenseDigest`]: validated lowercase hex SHA-256 of a license text.
//! - [`DigestOutcome`]: the three-shaped result of license resolution
//!   (`OPEN`, empty = deny, or an ordered list of digests to accept).
//! - [`BuildInfoDocument`]: parser for the `BUILD-INFO.txt` key/value
//!   metadata format.
//! - [`theme`]: vendor theme selection for legacy EULA directories.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `llp-*` crates.
//! - No I/O. Callers read files and hand bytes to the parser.
//! - No `.unwrap()` outside tests, except on constant regex patterns.

pub mod buildinfo;
pub mod digest;
pub mod error;
pub mod theme;

pub use buildinfo::{BuildInfoDocument, BuildInfoRecord};
pub use digest::{DigestOutcome, LicenseDigest};
pub use error::DigestError;
