//! # Engine Errors
//!
//! Configuration gaps in published metadata (no license text, unknown
//! theme) are not errors: they resolve to deny and are logged. What is left
//! here are infrastructure failures.

use llp_artifact::ArtifactError;
use llp_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to read license template for theme {theme}: {source}")]
    Template {
        theme: String,
        source: std::io::Error,
    },
}

/// A group-auth provider could not reach a decision.
#[derive(Error, Debug)]
pub enum GroupAuthError {
    #[error("{provider}: HTTP error: {source}")]
    Http {
        provider: &'static str,
        source: reqwest::Error,
    },

    #[error("{provider}: upstream returned {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider}: malformed response: {message}")]
    Response {
        provider: &'static str,
        message: String,
    },

    #[error("group directory {path}: {message}")]
    Directory { path: String, message: String },

    #[error("group auth configuration: {0}")]
    Config(String),
}
