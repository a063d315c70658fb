//! # Application State
//!
//! Shared by every handler: the artifact backend, the resolver (which owns
//! the License store) and the access policy with its provider chain.

use std::path::PathBuf;
use std::sync::Arc;

use llp_artifact::{find_local_artifact, find_object_artifact, ArtifactError, ArtifactNode, ObjectRoot};
use llp_engine::{
    AccessPolicy, CrowdGroupProvider, DirectoryGroupProvider, GroupAuthError, GroupAuthProvider,
    LicenseDigestResolver, SessionGroupProvider, ThemeTemplates, TrustRules,
};
use llp_store::LicenseStore;

use crate::config::AppConfig;

/// Where artifacts are served from.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Served directories, searched in order.
    Local(Arc<[PathBuf]>),
    Object(ObjectRoot),
}

impl Backend {
    pub fn local(served_paths: Vec<PathBuf>) -> Self {
        Self::Local(served_paths.into())
    }

    pub async fn find(&self, path: &str) -> Result<Option<Box<dyn ArtifactNode>>, ArtifactError> {
        Ok(match self {
            Self::Local(paths) => find_local_artifact(paths, path)
                .await?
                .map(|a| Box::new(a) as Box<dyn ArtifactNode>),
            Self::Object(root) => find_object_artifact(root, path)
                .await?
                .map(|a| Box::new(a) as Box<dyn ArtifactNode>),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Backend,
    pub resolver: Arc<LicenseDigestResolver>,
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        backend: Backend,
        store: Arc<dyn LicenseStore>,
    ) -> Result<Self, GroupAuthError> {
        let providers = build_providers(&config)?;
        let trust = TrustRules {
            internal_hosts: config.internal_hosts.clone(),
            path_allowlist: config.path_allowlist.clone(),
            access_keys: config.access_keys.clone(),
        };
        let resolver = LicenseDigestResolver::new(store, ThemeTemplates::new(&config.templates_dir));
        Ok(Self {
            config: Arc::new(config),
            backend,
            resolver: Arc::new(resolver),
            policy: Arc::new(AccessPolicy::new(trust, providers)),
        })
    }

    pub fn store(&self) -> &Arc<dyn LicenseStore> {
        self.resolver.store()
    }
}

/// Instantiate the configured group-auth providers, in order.
pub fn build_providers(config: &AppConfig) -> Result<Vec<Arc<dyn GroupAuthProvider>>, GroupAuthError> {
    let mut providers: Vec<Arc<dyn GroupAuthProvider>> = Vec::with_capacity(config.group_auth.len());
    for name in &config.group_auth {
        let provider: Arc<dyn GroupAuthProvider> = match name.as_str() {
            "session" => Arc::new(SessionGroupProvider::new(&config.login_url)),
            "directory" => {
                let path = config.groups_file.as_deref().ok_or_else(|| {
                    GroupAuthError::Config("directory provider requires LLP_GROUPS_FILE".into())
                })?;
                Arc::new(DirectoryGroupProvider::load(&config.login_url, path)?)
            }
            "crowd" => {
                let crowd = config.crowd.clone().ok_or_else(|| {
                    GroupAuthError::Config("crowd provider requires CROWD_API_URL".into())
                })?;
                Arc::new(CrowdGroupProvider::new(crowd)?)
            }
            other => {
                return Err(GroupAuthError::Config(format!(
                    "unknown group auth provider {other:?}"
                )))
            }
        };
        tracing::info!(provider = provider.name(), "group auth provider enabled");
        providers.push(provider);
    }
    Ok(providers)
}
