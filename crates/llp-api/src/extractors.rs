//! # Request Extractors
//!
//! [`Client`] turns request parts into the engine's [`ClientContext`]:
//!
//! | Source                                         | Field            |
//! |------------------------------------------------|------------------|
//! | `ConnectInfo<SocketAddr>`                      | `remote_ip`      |
//! | request path                                   | `path`           |
//! | `X-Remote-User`, `X-Remote-Groups`             | `user`           |
//! | `?key=`                                        | `access_key`     |
//! | `LICENSE_ACCEPTED` / `License-Accepted` header | accepted digests |
//! | cookies                                        | acceptance cookies |
//!
//! The user headers are only trustworthy behind an authenticating front
//! end that strips them from client requests.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use llp_engine::context::ACCEPTANCE_COOKIE_PREFIX;
use llp_engine::{ClientContext, RemoteUser};

pub const REMOTE_USER_HEADER: &str = "x-remote-user";
pub const REMOTE_GROUPS_HEADER: &str = "x-remote-groups";
pub const ACCEPTED_HEADERS: &[&str] = &["license_accepted", "license-accepted"];

/// The requesting client, as the access policy sees it.
#[derive(Debug, Clone)]
pub struct Client(pub ClientContext);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn remote_user(headers: &HeaderMap) -> Option<RemoteUser> {
    let username = header_str(headers, REMOTE_USER_HEADER)?.trim();
    if username.is_empty() {
        return None;
    }
    let groups = header_str(headers, REMOTE_GROUPS_HEADER)
        .map(|g| {
            g.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Some(RemoteUser::new(username).with_groups(groups))
}

/// First `key` parameter of a query string.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub fn client_context(parts: &Parts) -> ClientContext {
    let mut ctx = ClientContext::new(parts.uri.path());

    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        ctx = ctx.with_remote_ip(addr.ip());
    }
    if let Some(user) = remote_user(&parts.headers) {
        ctx = ctx.with_user(user);
    }
    if let Some(key) = query_param(parts.uri.query(), "key") {
        ctx = ctx.with_access_key(key);
    }
    for name in ACCEPTED_HEADERS {
        for value in parts.headers.get_all(*name) {
            if let Ok(v) = value.to_str() {
                ctx = ctx.with_accepted_header(v);
            }
        }
    }
    let jar = CookieJar::from_headers(&parts.headers);
    for cookie in jar.iter() {
        if cookie.name().starts_with(ACCEPTANCE_COOKIE_PREFIX) {
            ctx = ctx.with_cookie(cookie.name());
        }
    }
    ctx
}

impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Client(client_context(parts)))
    }
}
