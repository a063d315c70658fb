//! # Client Context
//!
//! Everything the access decision may look at about one request, extracted
//! by the HTTP layer so the engine never sees a raw request.

use std::collections::HashSet;
use std::net::IpAddr;

use llp_core::LicenseDigest;

/// Prefix of the cookie recording acceptance of one license.
pub const ACCEPTANCE_COOKIE_PREFIX: &str = "license_accepted_";

/// Cookie name recording acceptance of `digest`.
pub fn acceptance_cookie_name(digest: &LicenseDigest) -> String {
    format!("{ACCEPTANCE_COOKIE_PREFIX}{digest}")
}

/// The authenticated user, as asserted by the authenticating front end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteUser {
    pub username: String,
    pub groups: Vec<String>,
}

impl RemoteUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_any(&self, required: &[String]) -> bool {
        self.groups.iter().any(|g| required.contains(g))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub remote_ip: Option<IpAddr>,
    /// Request path with a leading `/`.
    pub path: String,
    pub user: Option<RemoteUser>,
    pub access_key: Option<String>,
    accepted: HashSet<String>,
    cookies: HashSet<String>,
}

impl ClientContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_remote_ip(mut self, ip: IpAddr) -> Self {
        self.remote_ip = Some(ip);
        self
    }

    pub fn with_user(mut self, user: RemoteUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_access_key(mut self, key: impl Into<String>) -> Self {
        self.access_key = Some(key.into());
        self
    }

    /// Digests listed in a `LICENSE_ACCEPTED` request header, space separated.
    pub fn with_accepted_header(mut self, value: &str) -> Self {
        self.accepted
            .extend(value.split_whitespace().map(str::to_string));
        self
    }

    /// Record the name of a cookie sent with the request.
    pub fn with_cookie(mut self, name: impl Into<String>) -> Self {
        self.cookies.insert(name.into());
        self
    }

    pub fn has_accepted(&self, digest: &LicenseDigest) -> bool {
        self.accepted.contains(digest.as_str())
            || self.cookies.contains(&acceptance_cookie_name(digest))
    }
}
