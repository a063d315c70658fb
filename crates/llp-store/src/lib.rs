//! # llp-store: License Store
//!
//! Content-addressed storage of license texts. A [`License`] row is keyed
//! by the SHA-256 of its text and created lazily the first time the
//! resolver sees that text. Rows are never updated or deleted here.
//!
//! ## Implementations
//!
//! | Type                  | Backing                     | Atomicity                         |
//! |-----------------------|-----------------------------|-----------------------------------|
//! | [`MemoryLicenseStore`] | `parking_lot::RwLock<HashMap>` | single write lock               |
//! | [`PgLicenseStore`]    | PostgreSQL `licenses` table | `INSERT .. ON CONFLICT DO NOTHING` |
//!
//! Both detect two different texts under one digest and report
//! [`StoreError::DigestCollision`] instead of picking a winner.

pub mod error;
pub mod license;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use license::{InsertOutcome, License, LicenseStore};
pub use memory::MemoryLicenseStore;
pub use postgres::PgLicenseStore;
