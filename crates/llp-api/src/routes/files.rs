//! # File Server
//!
//! Routes:
//! - GET /: listing of the served root
//! - GET /{*path}: listing for directories, license-gated download for files
//!
//! | Verdict            | Response                                      |
//! |--------------------|-----------------------------------------------|
//! | `Serve`            | `X-Sendfile` hand-off or presigned redirect   |
//! | `Forbidden`        | 403                                           |
//! | `RedirectToAccept` | 302 to `/license?lic=<digest>&url=<path>`     |
//! | `Authenticate`     | 302 to the login page                         |

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use llp_artifact::{is_hidden, ArtifactNode, Download};
use llp_engine::{dir_list, AccessVerdict};

use crate::error::AppError;
use crate::extractors::Client;
use crate::metrics;
use crate::state::AppState;

pub const SENDFILE_HEADER: HeaderName = HeaderName::from_static("x-sendfile");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(serve_root))
        .route("/{*path}", get(serve_path))
}

/// Find a servable node. Hidden names anywhere in the path are 404.
pub(crate) async fn locate(state: &AppState, path: &str) -> Result<Box<dyn ArtifactNode>, AppError> {
    if path.split('/').any(is_hidden) {
        return Err(AppError::NotFound(format!("/{path}")));
    }
    let node = state
        .backend
        .find(path)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("/{path}")))?;
    // A wildcard segment may expand to a name that was not in the request.
    if node.hidden() {
        return Err(AppError::NotFound(format!("/{path}")));
    }
    Ok(node)
}

pub(crate) fn found(location: &str) -> Result<Response, AppError> {
    let value = HeaderValue::from_str(location)
        .map_err(|e| AppError::Internal(format!("unencodable redirect target: {e}")))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, value)]).into_response())
}

fn accept_location(digest: &str, url: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("lic", digest)
        .append_pair("url", url)
        .finish();
    format!("/license?{query}")
}

fn download_response(download: Download) -> Result<Response, AppError> {
    match download {
        Download::Sendfile {
            path,
            file_name,
            mime,
        } => {
            let invalid = |e: axum::http::header::InvalidHeaderValue| {
                AppError::Internal(format!("unencodable header for {file_name}: {e}"))
            };
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
            headers.insert(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
                    .map_err(invalid)?,
            );
            headers.insert(
                SENDFILE_HEADER,
                HeaderValue::from_str(&path.to_string_lossy()).map_err(invalid)?,
            );
            Ok((StatusCode::OK, headers).into_response())
        }
        Download::Redirect { url } => found(&url),
    }
}

async fn serve_root(State(state): State<AppState>, Client(ctx): Client) -> Result<Response, AppError> {
    serve(&state, "", ctx).await
}

async fn serve_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Client(ctx): Client,
) -> Result<Response, AppError> {
    serve(&state, &path, ctx).await
}

async fn serve(
    state: &AppState,
    path: &str,
    ctx: llp_engine::ClientContext,
) -> Result<Response, AppError> {
    let node = locate(state, path).await?;

    if node.is_dir() {
        let entries = dir_list(&state.resolver, node.as_ref(), true).await?;
        return Ok(Json(serde_json::json!({
            "path": node.url(),
            "entries": entries,
        }))
        .into_response());
    }

    let resolution = state.resolver.resolve(node.as_ref()).await.map_err(|e| {
        metrics::record_resolution_error();
        e
    })?;
    let verdict = state.policy.decide(&ctx, &resolution).await?;
    metrics::record_verdict(&verdict);
    tracing::info!(
        url = %node.url(),
        verdict = verdict.label(),
        outcome = ?resolution.outcome,
        "access decided"
    );

    match verdict {
        AccessVerdict::Serve => download_response(node.download().await?),
        AccessVerdict::Forbidden(message) => Err(AppError::Forbidden(message)),
        AccessVerdict::RedirectToAccept { digest } => {
            found(&accept_location(digest.as_str(), &node.url()))
        }
        AccessVerdict::Authenticate { location } => found(&location),
    }
}
