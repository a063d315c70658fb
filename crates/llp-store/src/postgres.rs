//! # PostgreSQL License Store
//!
//! Rows live in the `licenses` table created by the embedded migrations.
//! Insert-if-absent relies on the primary key on `digest`: concurrent
//! writers race harmlessly and the loser's row is discarded by
//! `ON CONFLICT DO NOTHING`. The loser then re-reads the surviving text to
//! detect a collision.

use async_trait::async_trait;
use llp_core::LicenseDigest;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::StoreError;
use crate::license::{InsertOutcome, License, LicenseStore};

#[derive(sqlx::FromRow)]
struct LicenseRow {
    digest: String,
    text: String,
    theme: String,
}

impl TryFrom<LicenseRow> for License {
    type Error = StoreError;

    fn try_from(row: LicenseRow) -> Result<Self, Self::Error> {
        Ok(License {
            digest: LicenseDigest::parse(&row.digest)?,
            text: row.text,
            theme: row.theme,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgLicenseStore {
    pool: PgPool,
}

impl PgLicenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and apply the embedded migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("License store migrations applied");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LicenseStore for PgLicenseStore {
    async fn insert_if_absent(&self, license: &License) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            "INSERT INTO licenses (digest, text, theme) VALUES ($1, $2, $3)
             ON CONFLICT (digest) DO NOTHING",
        )
        .bind(license.digest.as_str())
        .bind(&license.text)
        .bind(&license.theme)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(digest = %license.digest, theme = %license.theme, "stored new license");
            return Ok(InsertOutcome::Inserted);
        }

        let stored: Option<(String,)> =
            sqlx::query_as("SELECT text FROM licenses WHERE digest = $1")
                .bind(license.digest.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match stored {
            Some((text,)) if text != license.text => {
                tracing::error!(
                    digest = %license.digest,
                    "license store holds a different text under the same digest"
                );
                Err(StoreError::DigestCollision {
                    digest: license.digest.clone(),
                })
            }
            _ => Ok(InsertOutcome::AlreadyPresent),
        }
    }

    async fn get(&self, digest: &LicenseDigest) -> Result<Option<License>, StoreError> {
        let row = sqlx::query_as::<_, LicenseRow>(
            "SELECT digest, text, theme FROM licenses WHERE digest = $1",
        )
        .bind(digest.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(License::try_from).transpose()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM licenses")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}
