//! # Group Authorization Providers
//!
//! A `BUILD-INFO.txt` may restrict a directory to members of named groups.
//! Membership is answered by providers tried in configured order.
//!
//! | Provider      | Membership source                                     |
//! |---------------|-------------------------------------------------------|
//! | `session`     | groups forwarded with the authenticated request       |
//! | `directory`   | a YAML group → members file loaded at start-up        |
//! | `crowd`       | Atlassian Crowd `user/group/nested` REST endpoint     |
//!
//! Every provider answers `NeedsAuth` for an anonymous client, pointing at
//! the login page with a `next` parameter that returns to the request path.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::context::{ClientContext, RemoteUser};
use crate::error::GroupAuthError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupAuthVerdict {
    Allow,
    Deny,
    /// The client must log in first; redirect to `location`.
    NeedsAuth { location: String },
}

#[async_trait]
pub trait GroupAuthProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether the client belongs to at least one of `groups`.
    async fn evaluate(
        &self,
        ctx: &ClientContext,
        groups: &[String],
    ) -> Result<GroupAuthVerdict, GroupAuthError>;
}

/// `<login_url>?next=<path>`.
pub fn login_redirect(login_url: &str, path: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", path)
        .finish();
    let sep = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{sep}{query}")
}

fn verdict(member: bool) -> GroupAuthVerdict {
    if member {
        GroupAuthVerdict::Allow
    } else {
        GroupAuthVerdict::Deny
    }
}

/// Common prelude: empty requirements allow, anonymous clients log in.
fn authenticated<'a>(
    ctx: &'a ClientContext,
    groups: &[String],
    login_url: &str,
) -> Result<&'a RemoteUser, GroupAuthVerdict> {
    if groups.is_empty() {
        return Err(GroupAuthVerdict::Allow);
    }
    ctx.user.as_ref().ok_or_else(|| GroupAuthVerdict::NeedsAuth {
        location: login_redirect(login_url, &ctx.path),
    })
}

// ── session ──────────────────────────────────────────────────────────

/// Trusts the groups the front end attached to the authenticated user.
#[derive(Debug, Clone)]
pub struct SessionGroupProvider {
    login_url: String,
}

impl SessionGroupProvider {
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
        }
    }
}

#[async_trait]
impl GroupAuthProvider for SessionGroupProvider {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn evaluate(
        &self,
        ctx: &ClientContext,
        groups: &[String],
    ) -> Result<GroupAuthVerdict, GroupAuthError> {
        let user = match authenticated(ctx, groups, &self.login_url) {
            Ok(u) => u,
            Err(v) => return Ok(v),
        };
        Ok(verdict(user.in_any(groups)))
    }
}

// ── directory ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GroupsFile {
    #[serde(default)]
    groups: BTreeMap<String, Vec<String>>,
}

/// Group membership from a static directory file:
///
/// ```yaml
/// groups:
///   linaro-android-restricted: [alice, bob]
///   partners: [carol]
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryGroupProvider {
    login_url: String,
    groups: BTreeMap<String, Vec<String>>,
}

impl DirectoryGroupProvider {
    pub fn from_yaml_str(login_url: impl Into<String>, yaml: &str) -> Result<Self, GroupAuthError> {
        let file: GroupsFile = serde_yaml::from_str(yaml).map_err(|e| GroupAuthError::Directory {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        Ok(Self {
            login_url: login_url.into(),
            groups: file.groups,
        })
    }

    pub fn load(login_url: impl Into<String>, path: &Path) -> Result<Self, GroupAuthError> {
        let describe = |message: String| GroupAuthError::Directory {
            path: path.display().to_string(),
            message,
        };
        let yaml = std::fs::read_to_string(path).map_err(|e| describe(e.to_string()))?;
        let file: GroupsFile = serde_yaml::from_str(&yaml).map_err(|e| describe(e.to_string()))?;
        tracing::info!(path = %path.display(), groups = file.groups.len(), "loaded group directory");
        Ok(Self {
            login_url: login_url.into(),
            groups: file.groups,
        })
    }

    fn groups_of<'a>(&'a self, username: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.groups
            .iter()
            .filter(move |(_, members)| members.iter().any(|m| m == username))
            .map(|(g, _)| g.as_str())
    }
}

#[async_trait]
impl GroupAuthProvider for DirectoryGroupProvider {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn evaluate(
        &self,
        ctx: &ClientContext,
        groups: &[String],
    ) -> Result<GroupAuthVerdict, GroupAuthError> {
        let user = match authenticated(ctx, groups, &self.login_url) {
            Ok(u) => u,
            Err(v) => return Ok(v),
        };
        tracing::debug!(user = %user.username, "checking group directory");
        let member = self
            .groups_of(&user.username)
            .any(|g| groups.iter().any(|r| r == g));
        Ok(verdict(member))
    }
}

// ── crowd ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CrowdConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub login_url: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for CrowdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrowdConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("login_url", &self.login_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CrowdGroups {
    groups: Vec<CrowdGroup>,
}

#[derive(Debug, Deserialize)]
struct CrowdGroup {
    name: String,
}

/// Asks Crowd for the user's nested group memberships on every check.
#[derive(Debug)]
pub struct CrowdGroupProvider {
    client: reqwest::Client,
    config: CrowdConfig,
}

impl CrowdGroupProvider {
    const NAME: &'static str = "crowd";

    pub fn new(mut config: CrowdConfig) -> Result<Self, GroupAuthError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        if config.base_url.is_empty() {
            return Err(GroupAuthError::Config("crowd base URL is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GroupAuthError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn user_groups(&self, username: &str) -> Result<Vec<String>, GroupAuthError> {
        let url = format!("{}/user/group/nested.json", self.config.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("username", username)])
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| GroupAuthError::Http {
                provider: Self::NAME,
                source,
            })?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(GroupAuthError::Status {
                provider: Self::NAME,
                status: status.as_u16(),
            });
        }
        let body: CrowdGroups = resp.json().await.map_err(|e| GroupAuthError::Response {
            provider: Self::NAME,
            message: e.to_string(),
        })?;
        Ok(body.groups.into_iter().map(|g| g.name).collect())
    }
}

#[async_trait]
impl GroupAuthProvider for CrowdGroupProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn evaluate(
        &self,
        ctx: &ClientContext,
        groups: &[String],
    ) -> Result<GroupAuthVerdict, GroupAuthError> {
        let user = match authenticated(ctx, groups, &self.config.login_url) {
            Ok(u) => u,
            Err(v) => return Ok(v),
        };
        tracing::info!(user = %user.username, "checking groups with Crowd");
        let member_of = self.user_groups(&user.username).await?;
        Ok(verdict(member_of.iter().any(|g| groups.contains(g))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn required(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn alice() -> ClientContext {
        ClientContext::new("/android/restricted/boot.img")
            .with_user(RemoteUser::new("alice").with_groups(["linaro-team"]))
    }

    #[test]
    fn login_redirect_encodes_next() {
        assert_eq!(
            login_redirect("/login/", "/a/b c"),
            "/login/?next=%2Fa%2Fb+c"
        );
        assert_eq!(
            login_redirect("https://sso.example/login?app=llp", "/x"),
            "https://sso.example/login?app=llp&next=%2Fx"
        );
    }

    #[tokio::test]
    async fn session_provider() {
        let p = SessionGroupProvider::new("/login/");
        let want = required(&["linaro-team"]);
        assert_eq!(p.evaluate(&alice(), &want).await.unwrap(), GroupAuthVerdict::Allow);
        assert_eq!(
            p.evaluate(&alice(), &required(&["partners"])).await.unwrap(),
            GroupAuthVerdict::Deny
        );
        assert_eq!(
            p.evaluate(&ClientContext::new("/p"), &want).await.unwrap(),
            GroupAuthVerdict::NeedsAuth {
                location: "/login/?next=%2Fp".into()
            }
        );
        assert_eq!(
            p.evaluate(&ClientContext::new("/p"), &[]).await.unwrap(),
            GroupAuthVerdict::Allow
        );
    }

    #[tokio::test]
    async fn directory_provider() {
        let p = DirectoryGroupProvider::from_yaml_str(
            "/login/",
            "groups:\n  partners: [alice, bob]\n  staff: [carol]\n",
        )
        .unwrap();
        assert_eq!(
            p.evaluate(&alice(), &required(&["partners"])).await.unwrap(),
            GroupAuthVerdict::Allow
        );
        assert_eq!(
            p.evaluate(&alice(), &required(&["staff"])).await.unwrap(),
            GroupAuthVerdict::Deny
        );
    }

    #[test]
    fn directory_provider_rejects_bad_yaml() {
        assert!(matches!(
            DirectoryGroupProvider::from_yaml_str("/login/", "groups: [unclosed"),
            Err(GroupAuthError::Directory { .. })
        ));
    }

    #[tokio::test]
    async fn directory_provider_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("groups.yaml");
        std::fs::write(&file, "groups:\n  partners: [alice]\n").unwrap();
        let p = DirectoryGroupProvider::load("/login/", &file).unwrap();
        assert_eq!(
            p.evaluate(&alice(), &required(&["partners"])).await.unwrap(),
            GroupAuthVerdict::Allow
        );
        assert!(DirectoryGroupProvider::load("/login/", &dir.path().join("none")).is_err());
    }

    fn crowd(server: &MockServer) -> CrowdGroupProvider {
        CrowdGroupProvider::new(CrowdConfig {
            base_url: format!("{}/crowd/rest/usermanagement/1/", server.uri()),
            username: "llp".into(),
            password: "secret".into(),
            login_url: "/login/".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn crowd_member() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/crowd/rest/usermanagement/1/user/group/nested.json"))
            .and(query_param("username", "alice"))
            .and(header("Authorization", "Basic bGxwOnNlY3JldA=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "expand": "group",
                "groups": [{"name": "linaro-team"}, {"name": "partners"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let v = crowd(&server)
            .evaluate(&alice(), &required(&["partners"]))
            .await
            .unwrap();
        assert_eq!(v, GroupAuthVerdict::Allow);
    }

    #[tokio::test]
    async fn crowd_non_member() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"groups": []})),
            )
            .mount(&server)
            .await;

        let v = crowd(&server)
            .evaluate(&alice(), &required(&["partners"]))
            .await
            .unwrap();
        assert_eq!(v, GroupAuthVerdict::Deny);
    }

    #[tokio::test]
    async fn crowd_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = crowd(&server)
            .evaluate(&alice(), &required(&["partners"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GroupAuthError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn crowd_anonymous_needs_login_without_calling_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let v = crowd(&server)
            .evaluate(&ClientContext::new("/x"), &required(&["partners"]))
            .await
            .unwrap();
        assert!(matches!(v, GroupAuthVerdict::NeedsAuth { .. }));
    }

    #[test]
    fn crowd_config_redacts_password() {
        let c = CrowdConfig {
            base_url: "https://crowd".into(),
            username: "llp".into(),
            password: "hunter2".into(),
            login_url: "/login/".into(),
            timeout_secs: 5,
        };
        assert!(!format!("{c:?}").contains("hunter2"));
    }
}
