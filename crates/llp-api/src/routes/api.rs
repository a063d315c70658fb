//! # JSON API
//!
//! Routes:
//! - GET /api/ls and /api/ls/{*path}: machine-readable listing with
//!   license digests; a file lists as a single entry
//! - GET /api/license/{*path}: digests, auth groups and license texts
//!   governing a file or, for a directory, every record of its BUILD-INFO

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use llp_engine::{dir_list, LicensedEntry, ListedDigests};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::routes::files::locate;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ls", get(ls_root))
        .route("/api/ls/{*path}", get(ls_path))
        .route("/api/license/{*path}", get(license_path))
}

async fn ls_root(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    ls(&state, "").await
}

async fn ls_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>, AppError> {
    ls(&state, &path).await
}

async fn ls(state: &AppState, path: &str) -> Result<Json<Value>, AppError> {
    let node = locate(state, path).await?;
    let files = if node.is_dir() {
        dir_list(&state.resolver, node.as_ref(), false).await?
    } else {
        let resolution = state.resolver.resolve(node.as_ref()).await?;
        let license_list = state.resolver.licenses(&resolution).await?;
        vec![LicensedEntry {
            entry: node.listing_entry(false),
            license_digest_list: ListedDigests::Resolved(resolution.outcome),
            license_list,
        }]
    };
    Ok(Json(json!({ "files": files })))
}

async fn license_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>, AppError> {
    let node = locate(&state, &path).await?;
    let resolution = state.resolver.resolve(node.as_ref()).await?;
    let licenses = state.resolver.licenses(&resolution).await?;
    Ok(Json(json!({
        "url": node.url(),
        "license_digest_list": resolution.outcome,
        "auth_groups": resolution.auth_groups,
        "licenses": licenses,
    })))
}
