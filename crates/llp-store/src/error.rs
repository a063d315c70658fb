//! # Store Errors

use llp_core::{DigestError, LicenseDigest};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A different text is already stored under this digest.
    ///
    /// Either SHA-256 collided or a license text is not deterministic.
    /// Both are integrity faults.
    #[error("digest collision: stored text for {digest} differs from the inserted text")]
    DigestCollision { digest: LicenseDigest },

    /// A stored row carries a digest that does not parse.
    #[error("corrupt license row: {0}")]
    CorruptRow(#[from] DigestError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
