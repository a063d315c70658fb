//! # License Display and Acceptance
//!
//! Routes:
//! - GET  /license?lic=<digest>&url=<path>: the license text as JSON
//! - POST /accept-license?lic=<digest>&url=<path>: form field `accept`
//!   required; sets `license_accepted_<digest>` for the file's directory
//!   for 24 hours and redirects back to `url`

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use llp_core::LicenseDigest;
use llp_engine::context::acceptance_cookie_name;
use llp_store::License;
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::files::found;
use crate::state::AppState;

/// Lifetime of an acceptance cookie.
pub const ACCEPTANCE_MAX_AGE_SECS: i64 = 60 * 60 * 24;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/license", get(show_license))
        .route("/accept-license", post(accept_license))
}

#[derive(Debug, Deserialize)]
pub struct LicenseQuery {
    pub lic: Option<String>,
    pub url: Option<String>,
}

fn parse_digest(lic: Option<&str>) -> Result<LicenseDigest, AppError> {
    let lic = lic.ok_or_else(|| AppError::Validation("missing lic parameter".into()))?;
    LicenseDigest::parse(lic).map_err(|e| AppError::Validation(format!("lic: {e}")))
}

/// Only local absolute paths are valid return targets. `;` and `,` would
/// end the cookie `Path` attribute early.
fn return_url(url: Option<&str>) -> Result<&str, AppError> {
    let url = url.ok_or_else(|| AppError::Validation("missing url parameter".into()))?;
    if !url.starts_with('/')
        || url.starts_with("//")
        || url.contains(['\\', ';', ','])
        || url.chars().any(char::is_control)
    {
        return Err(AppError::Validation("url must be a local absolute path".into()));
    }
    Ok(url)
}

/// Cookie path covering the directory of `url`.
fn cookie_path(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path.trim_start_matches('/').rsplit_once('/') {
        Some((dir, _)) => format!("/{dir}"),
        None => "/".to_string(),
    }
}

async fn lookup(state: &AppState, digest: &LicenseDigest) -> Result<License, AppError> {
    state
        .store()
        .get(digest)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("license {digest}")))
}

async fn show_license(
    State(state): State<AppState>,
    Query(q): Query<LicenseQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let digest = parse_digest(q.lic.as_deref())?;
    let license = lookup(&state, &digest).await?;
    Ok(Json(serde_json::json!({
        "license": license,
        "url": q.url,
    })))
}

async fn accept_license(
    State(state): State<AppState>,
    Query(q): Query<LicenseQuery>,
    jar: CookieJar,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let digest = parse_digest(q.lic.as_deref())?;
    let url = return_url(q.url.as_deref())?;
    if !form.contains_key("accept") {
        return Err(AppError::Forbidden("License was not accepted.".into()));
    }
    let license = lookup(&state, &digest).await?;

    let cookie = Cookie::build((acceptance_cookie_name(&license.digest), "1"))
        .path(cookie_path(url))
        .max_age(time::Duration::seconds(ACCEPTANCE_MAX_AGE_SECS));
    tracing::info!(digest = %license.digest, url, "license accepted");

    Ok((jar.add(cookie), found(url)?).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_path_is_the_directory() {
        assert_eq!(cookie_path("/android/latest/boot.img"), "/android/latest");
        assert_eq!(cookie_path("android/boot.img"), "/android");
        assert_eq!(cookie_path("/boot.img"), "/");
        assert_eq!(cookie_path("/a/b.img?key=1"), "/a");
    }

    #[test]
    fn return_url_must_be_local() {
        assert!(return_url(Some("/a/b")).is_ok());
        assert!(return_url(Some("https://evil.example/")).is_err());
        assert!(return_url(Some("//evil.example/")).is_err());
        assert!(return_url(Some("/a\r\nSet-Cookie: x")).is_err());
        assert!(return_url(Some("/a;Domain=example.org;SameSite=None/b.img")).is_err());
        assert!(return_url(Some("/a,b/c.img")).is_err());
        assert!(return_url(None).is_err());
    }

    #[test]
    fn digest_must_be_well_formed() {
        assert!(parse_digest(Some("nope")).is_err());
        assert!(parse_digest(None).is_err());
        let d = LicenseDigest::of_text("Sample text");
        assert_eq!(parse_digest(Some(d.as_str())).unwrap(), d);
    }
}
