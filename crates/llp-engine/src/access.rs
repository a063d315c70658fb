//! # Access Decision
//!
//! Combines a [`Resolution`] with what is known about the client.
//!
//! | Step | Rule                                                        | Verdict on failure   |
//! |------|-------------------------------------------------------------|----------------------|
//! | 1    | trusted client (internal host, allowlisted path, access key) skips steps 3-5 | n/a |
//! | 2    | `auth-groups` checked by providers in order                 | `Forbidden` / `Authenticate` |
//! | 3    | empty digest list                                           | `Forbidden`          |
//! | 4    | `OPEN`                                                      | `Serve`              |
//! | 5    | every digest accepted (header or cookie), in order          | `RedirectToAccept`   |
//!
//! The same inputs always give the same verdict.

use std::net::IpAddr;
use std::sync::Arc;

use llp_core::{DigestOutcome, LicenseDigest};

use crate::context::ClientContext;
use crate::error::GroupAuthError;
use crate::group_auth::{GroupAuthProvider, GroupAuthVerdict};
use crate::resolver::Resolution;

pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to access this file.";

/// What to do with a download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessVerdict {
    /// Send the file.
    Serve,
    /// Refuse with 403 and this message.
    Forbidden(String),
    /// Send the client to the acceptance page for the first unaccepted digest.
    RedirectToAccept { digest: LicenseDigest },
    /// Send the client to a group provider's login page.
    Authenticate { location: String },
}

impl AccessVerdict {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Serve => "serve",
            Self::Forbidden(_) => "forbidden",
            Self::RedirectToAccept { .. } => "redirect_to_accept",
            Self::Authenticate { .. } => "authenticate",
        }
    }

    fn forbidden() -> Self {
        Self::Forbidden(FORBIDDEN_MESSAGE.to_string())
    }
}

/// Clients that bypass license acceptance.
#[derive(Clone, Default)]
pub struct TrustRules {
    /// Client addresses treated as internal mirrors.
    pub internal_hosts: Vec<IpAddr>,
    /// Request-path prefixes served without acceptance.
    pub path_allowlist: Vec<String>,
    /// Secrets accepted as the `?key=` query parameter.
    pub access_keys: Vec<String>,
}

impl std::fmt::Debug for TrustRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustRules")
            .field("internal_hosts", &self.internal_hosts)
            .field("path_allowlist", &self.path_allowlist)
            .field("access_keys", &format!("[{} REDACTED]", self.access_keys.len()))
            .finish()
    }
}

impl TrustRules {
    /// Internal host, allowlisted path prefix or a known access key.
    pub fn trusts(&self, ctx: &ClientContext) -> bool {
        if ctx
            .remote_ip
            .is_some_and(|ip| self.internal_hosts.contains(&ip))
        {
            return true;
        }
        if self
            .path_allowlist
            .iter()
            .any(|prefix| !prefix.is_empty() && ctx.path.starts_with(prefix.as_str()))
        {
            return true;
        }
        ctx.access_key
            .as_deref()
            .is_some_and(|k| !k.is_empty() && self.access_keys.iter().any(|a| a == k))
    }
}

/// Trust rules plus the group providers consulted for `auth-groups`.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub trust: TrustRules,
    /// Asked in order; the first conclusive answer wins.
    pub providers: Vec<Arc<dyn GroupAuthProvider>>,
}

impl AccessPolicy {
    pub fn new(trust: TrustRules, providers: Vec<Arc<dyn GroupAuthProvider>>) -> Self {
        Self { trust, providers }
    }

    /// The verdict for `ctx` requesting a node governed by `resolution`.
    pub async fn decide(
        &self,
        ctx: &ClientContext,
        resolution: &Resolution,
    ) -> Result<AccessVerdict, GroupAuthError> {
        let trusted = self.trust.trusts(ctx);

        if !resolution.auth_groups.is_empty() {
            if let Some(refusal) = self.check_groups(ctx, &resolution.auth_groups).await? {
                return Ok(refusal);
            }
        }

        if trusted {
            tracing::debug!(path = %ctx.path, "trusted client, skipping license acceptance");
            return Ok(AccessVerdict::Serve);
        }

        match &resolution.outcome {
            DigestOutcome::Open => Ok(AccessVerdict::Serve),
            DigestOutcome::Digests(digests) if digests.is_empty() => Ok(AccessVerdict::forbidden()),
            DigestOutcome::Digests(digests) => Ok(digests
                .iter()
                .find(|d| !ctx.has_accepted(d))
                .map(|d| AccessVerdict::RedirectToAccept { digest: d.clone() })
                .unwrap_or(AccessVerdict::Serve)),
        }
    }

    /// `None` when group membership is confirmed.
    async fn check_groups(
        &self,
        ctx: &ClientContext,
        groups: &[String],
    ) -> Result<Option<AccessVerdict>, GroupAuthError> {
        let mut needs_auth = None;
        for provider in &self.providers {
            let verdict = provider.evaluate(ctx, groups).await.map_err(|e| {
                tracing::error!(provider = provider.name(), error = %e, "group auth failed");
                e
            })?;
            match verdict {
                GroupAuthVerdict::Allow => return Ok(None),
                GroupAuthVerdict::Deny => {
                    tracing::info!(provider = provider.name(), path = %ctx.path, "group auth denied");
                    return Ok(Some(AccessVerdict::forbidden()));
                }
                GroupAuthVerdict::NeedsAuth { location } => needs_auth = Some(location),
            }
        }
        Ok(Some(match needs_auth {
            Some(location) => AccessVerdict::Authenticate { location },
            None => {
                tracing::warn!(path = %ctx.path, "auth groups required but no provider decided");
                AccessVerdict::forbidden()
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{acceptance_cookie_name, RemoteUser};
    use crate::group_auth::SessionGroupProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> LicenseDigest {
        LicenseDigest::of_text("Sample text")
    }

    fn other() -> LicenseDigest {
        LicenseDigest::of_text("Other text")
    }

    fn protected(digests: Vec<LicenseDigest>) -> Resolution {
        Resolution {
            outcome: DigestOutcome::Digests(digests),
            auth_groups: Vec::new(),
        }
    }

    fn gated(outcome: DigestOutcome, groups: &[&str]) -> Resolution {
        Resolution {
            outcome,
            auth_groups: groups.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn session_policy() -> AccessPolicy {
        AccessPolicy::new(
            TrustRules::default(),
            vec![Arc::new(SessionGroupProvider::new("/login/"))],
        )
    }

    #[derive(Debug)]
    struct Fixed(GroupAuthVerdict, AtomicUsize);

    #[async_trait]
    impl GroupAuthProvider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn evaluate(
            &self,
            _: &ClientContext,
            _: &[String],
        ) -> Result<GroupAuthVerdict, GroupAuthError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl GroupAuthProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn evaluate(
            &self,
            _: &ClientContext,
            _: &[String],
        ) -> Result<GroupAuthVerdict, GroupAuthError> {
            Err(GroupAuthError::Status {
                provider: "failing",
                status: 503,
            })
        }
    }

    #[tokio::test]
    async fn open_serves() {
        let v = AccessPolicy::default()
            .decide(&ClientContext::new("/a"), &Resolution::open())
            .await
            .unwrap();
        assert_eq!(v, AccessVerdict::Serve);
    }

    #[tokio::test]
    async fn empty_digest_list_is_forbidden() {
        let v = AccessPolicy::default()
            .decide(&ClientContext::new("/a"), &Resolution::unresolved())
            .await
            .unwrap();
        assert!(matches!(v, AccessVerdict::Forbidden(_)));
    }

    #[tokio::test]
    async fn first_unaccepted_digest_redirects() {
        let policy = AccessPolicy::default();
        let res = protected(vec![sample(), other()]);

        let none = ClientContext::new("/a");
        assert_eq!(
            policy.decide(&none, &res).await.unwrap(),
            AccessVerdict::RedirectToAccept { digest: sample() }
        );

        let first = ClientContext::new("/a").with_cookie(acceptance_cookie_name(&sample()));
        assert_eq!(
            policy.decide(&first, &res).await.unwrap(),
            AccessVerdict::RedirectToAccept { digest: other() }
        );

        let both = first.with_accepted_header(other().as_str());
        assert_eq!(policy.decide(&both, &res).await.unwrap(), AccessVerdict::Serve);
    }

    #[tokio::test]
    async fn decision_is_idempotent() {
        let policy = AccessPolicy::default();
        let res = protected(vec![sample()]);
        let ctx = ClientContext::new("/a");
        let a = policy.decide(&ctx, &res).await.unwrap();
        let b = policy.decide(&ctx, &res).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn trusted_clients_skip_acceptance() {
        let policy = AccessPolicy::new(
            TrustRules {
                internal_hosts: vec!["10.0.0.5".parse().unwrap()],
                path_allowlist: vec!["/hwpacks".into()],
                access_keys: vec!["k3y".into()],
            },
            Vec::new(),
        );
        let res = protected(vec![sample()]);

        let by_ip = ClientContext::new("/a").with_remote_ip("10.0.0.5".parse().unwrap());
        let by_path = ClientContext::new("/hwpacks/ti/x.tar.gz");
        let by_key = ClientContext::new("/a").with_access_key("k3y");
        for ctx in [by_ip, by_path, by_key] {
            assert_eq!(policy.decide(&ctx, &res).await.unwrap(), AccessVerdict::Serve);
        }

        let stranger = ClientContext::new("/a")
            .with_remote_ip("10.0.0.6".parse().unwrap())
            .with_access_key("wrong");
        assert!(matches!(
            policy.decide(&stranger, &res).await.unwrap(),
            AccessVerdict::RedirectToAccept { .. }
        ));
    }

    #[tokio::test]
    async fn trusted_clients_still_need_groups() {
        let policy = AccessPolicy::new(
            TrustRules {
                internal_hosts: vec!["10.0.0.5".parse().unwrap()],
                ..TrustRules::default()
            },
            vec![Arc::new(SessionGroupProvider::new("/login/"))],
        );
        let ctx = ClientContext::new("/r/x").with_remote_ip("10.0.0.5".parse().unwrap());
        let v = policy
            .decide(&ctx, &gated(DigestOutcome::Open, &["team"]))
            .await
            .unwrap();
        assert!(matches!(v, AccessVerdict::Authenticate { .. }));
    }

    #[tokio::test]
    async fn anonymous_client_must_authenticate_for_groups() {
        let v = session_policy()
            .decide(
                &ClientContext::new("/restricted/a"),
                &gated(DigestOutcome::Open, &["team"]),
            )
            .await
            .unwrap();
        assert_eq!(
            v,
            AccessVerdict::Authenticate {
                location: "/login/?next=%2Frestricted%2Fa".into()
            }
        );
    }

    #[tokio::test]
    async fn member_then_license_gate() {
        let ctx = ClientContext::new("/r/a").with_user(RemoteUser::new("alice").with_groups(["team"]));
        let policy = session_policy();

        let open = gated(DigestOutcome::Open, &["team"]);
        assert_eq!(policy.decide(&ctx, &open).await.unwrap(), AccessVerdict::Serve);

        let licensed = gated(DigestOutcome::Digests(vec![sample()]), &["team"]);
        assert_eq!(
            policy.decide(&ctx, &licensed).await.unwrap(),
            AccessVerdict::RedirectToAccept { digest: sample() }
        );

        let stranger = ClientContext::new("/r/a").with_user(RemoteUser::new("mallory"));
        assert!(matches!(
            policy.decide(&stranger, &open).await.unwrap(),
            AccessVerdict::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn providers_are_tried_in_order() {
        let needs = Arc::new(Fixed(
            GroupAuthVerdict::NeedsAuth {
                location: "/sso".into(),
            },
            AtomicUsize::new(0),
        ));
        let allow = Arc::new(Fixed(GroupAuthVerdict::Allow, AtomicUsize::new(0)));
        let deny = Arc::new(Fixed(GroupAuthVerdict::Deny, AtomicUsize::new(0)));
        let providers: Vec<Arc<dyn GroupAuthProvider>> =
            vec![needs.clone(), allow.clone(), deny.clone()];
        let policy = AccessPolicy::new(TrustRules::default(), providers);

        let v = policy
            .decide(&ClientContext::new("/a"), &gated(DigestOutcome::Open, &["g"]))
            .await
            .unwrap();
        assert_eq!(v, AccessVerdict::Serve);
        assert_eq!(needs.1.load(Ordering::SeqCst), 1);
        assert_eq!(allow.1.load(Ordering::SeqCst), 1);
        assert_eq!(deny.1.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn last_needs_auth_is_surfaced() {
        let providers: Vec<Arc<dyn GroupAuthProvider>> = vec![
            Arc::new(Fixed(
                GroupAuthVerdict::NeedsAuth { location: "/first".into() },
                AtomicUsize::new(0),
            )),
            Arc::new(Fixed(
                GroupAuthVerdict::NeedsAuth { location: "/second".into() },
                AtomicUsize::new(0),
            )),
        ];
        let policy = AccessPolicy::new(TrustRules::default(), providers);
        let v = policy
            .decide(&ClientContext::new("/a"), &gated(DigestOutcome::Open, &["g"]))
            .await
            .unwrap();
        assert_eq!(v, AccessVerdict::Authenticate { location: "/second".into() });
    }

    #[tokio::test]
    async fn groups_without_providers_are_forbidden() {
        let v = AccessPolicy::default()
            .decide(&ClientContext::new("/a"), &gated(DigestOutcome::Open, &["g"]))
            .await
            .unwrap();
        assert!(matches!(v, AccessVerdict::Forbidden(_)));
    }

    #[tokio::test]
    async fn provider_error_aborts() {
        let allow = Arc::new(Fixed(GroupAuthVerdict::Allow, AtomicUsize::new(0)));
        let providers: Vec<Arc<dyn GroupAuthProvider>> = vec![Arc::new(Failing), allow.clone()];
        let policy = AccessPolicy::new(TrustRules::default(), providers);
        let err = policy
            .decide(&ClientContext::new("/a"), &gated(DigestOutcome::Open, &["g"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GroupAuthError::Status { status: 503, .. }));
        assert_eq!(allow.1.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn access_keys_are_redacted() {
        let t = TrustRules {
            access_keys: vec!["sekrit".into()],
            ..TrustRules::default()
        };
        assert!(!format!("{t:?}").contains("sekrit"));
    }
}
