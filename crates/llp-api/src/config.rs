//! # Configuration
//!
//! Everything is read from the environment once at start-up.
//!
//! | Variable                   | Default              |
//! |----------------------------|----------------------|
//! | `PORT`                     | `8080`               |
//! | `LLP_SERVED_PATHS`         | `./sampleroot`       |
//! | `LLP_TEMPLATES_DIR`        | `templates/licenses` |
//! | `LLP_INTERNAL_HOSTS`       | none                 |
//! | `LLP_PATH_ALLOWLIST`       | none                 |
//! | `LLP_ACCESS_KEYS`          | none                 |
//! | `LLP_LOGIN_URL`            | `/login/`            |
//! | `LLP_GROUP_AUTH`           | `session`            |
//! | `LLP_GROUPS_FILE`          | none                 |
//! | `CROWD_API_URL`            | none                 |
//! | `CROWD_API_USERNAME`       | empty                |
//! | `CROWD_API_PASSWORD`       | empty                |
//! | `LLP_STORAGE_TIMEOUT_SECS` | `30`                 |
//! | `DATABASE_URL`             | none (in-memory)     |
//! | `LLP_METRICS_ENABLED`      | `true`               |
//!
//! List values are comma separated, except `LLP_SERVED_PATHS` which is
//! colon separated like `PATH`.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use llp_engine::CrowdConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub served_paths: Vec<PathBuf>,
    pub templates_dir: PathBuf,
    pub internal_hosts: Vec<IpAddr>,
    pub path_allowlist: Vec<String>,
    pub access_keys: Vec<String>,
    pub login_url: String,
    /// Group-auth provider names, in the order they are asked.
    pub group_auth: Vec<String>,
    pub groups_file: Option<PathBuf>,
    pub crowd: Option<CrowdConfig>,
    pub storage_timeout: Duration,
    pub database_url: Option<String>,
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            served_paths: vec![PathBuf::from("./sampleroot")],
            templates_dir: PathBuf::from("templates/licenses"),
            internal_hosts: Vec::new(),
            path_allowlist: Vec::new(),
            access_keys: Vec::new(),
            login_url: "/login/".to_string(),
            group_auth: vec!["session".to_string()],
            groups_file: None,
            crowd: None,
            storage_timeout: Duration::from_secs(30),
            database_url: None,
            metrics_enabled: true,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("served_paths", &self.served_paths)
            .field("templates_dir", &self.templates_dir)
            .field("internal_hosts", &self.internal_hosts)
            .field("path_allowlist", &self.path_allowlist)
            .field("access_keys", &format!("[{} REDACTED]", self.access_keys.len()))
            .field("login_url", &self.login_url)
            .field("group_auth", &self.group_auth)
            .field("groups_file", &self.groups_file)
            .field("crowd", &self.crowd)
            .field("storage_timeout", &self.storage_timeout)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

fn split_list(value: &str, sep: char) -> Vec<String> {
    value
        .split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = get("PORT") {
            cfg.port = v.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var: "PORT",
                value: v.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(v) = get("LLP_SERVED_PATHS") {
            cfg.served_paths = split_list(&v, ':').into_iter().map(PathBuf::from).collect();
        }
        if let Some(v) = get("LLP_TEMPLATES_DIR") {
            cfg.templates_dir = PathBuf::from(v);
        }
        if let Some(v) = get("LLP_INTERNAL_HOSTS") {
            cfg.internal_hosts = split_list(&v, ',')
                .into_iter()
                .map(|h| {
                    h.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                        var: "LLP_INTERNAL_HOSTS",
                        value: h.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = get("LLP_PATH_ALLOWLIST") {
            cfg.path_allowlist = split_list(&v, ',');
        }
        if let Some(v) = get("LLP_ACCESS_KEYS") {
            cfg.access_keys = split_list(&v, ',');
        }
        if let Some(v) = get("LLP_LOGIN_URL") {
            cfg.login_url = v;
        }
        if let Some(v) = get("LLP_GROUP_AUTH") {
            cfg.group_auth = split_list(&v, ',');
        }
        cfg.groups_file = get("LLP_GROUPS_FILE").map(PathBuf::from);
        if let Some(v) = get("LLP_STORAGE_TIMEOUT_SECS") {
            let secs: u64 = v.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var: "LLP_STORAGE_TIMEOUT_SECS",
                value: v.clone(),
                reason: e.to_string(),
            })?;
            cfg.storage_timeout = Duration::from_secs(secs);
        }
        cfg.crowd = get("CROWD_API_URL").map(|base_url| CrowdConfig {
            base_url,
            username: get("CROWD_API_USERNAME").unwrap_or_default(),
            password: get("CROWD_API_PASSWORD").unwrap_or_default(),
            login_url: cfg.login_url.clone(),
            timeout_secs: cfg.storage_timeout.as_secs(),
        });
        cfg.database_url = get("DATABASE_URL").filter(|u| !u.is_empty());
        if let Some(v) = get("LLP_METRICS_ENABLED") {
            cfg.metrics_enabled = v.to_lowercase() != "false";
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.group_auth, ["session"]);
        assert_eq!(cfg.login_url, "/login/");
        assert!(cfg.crowd.is_none());
        assert!(cfg.database_url.is_none());
        assert!(cfg.metrics_enabled);
    }

    #[test]
    fn parses_lists_and_crowd() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("LLP_SERVED_PATHS", "/srv/a:/srv/b"),
            ("LLP_INTERNAL_HOSTS", "10.0.0.1, 10.0.0.2"),
            ("LLP_PATH_ALLOWLIST", "/hwpacks,/precise/restricted"),
            ("LLP_GROUP_AUTH", "session,crowd"),
            ("LLP_LOGIN_URL", "/sso/"),
            ("CROWD_API_URL", "https://crowd.example/rest"),
            ("CROWD_API_USERNAME", "llp"),
            ("CROWD_API_PASSWORD", "pw"),
            ("LLP_METRICS_ENABLED", "FALSE"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.served_paths, [PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]);
        assert_eq!(cfg.internal_hosts.len(), 2);
        assert_eq!(cfg.path_allowlist, ["/hwpacks", "/precise/restricted"]);
        assert_eq!(cfg.group_auth, ["session", "crowd"]);
        let crowd = cfg.crowd.unwrap();
        assert_eq!(crowd.username, "llp");
        assert_eq!(crowd.login_url, "/sso/");
        assert!(!cfg.metrics_enabled);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("LLP_INTERNAL_HOSTS", "not-an-ip")])).is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("LLP_ACCESS_KEYS", "topsecret"),
            ("DATABASE_URL", "postgres://u:hunter2@db/llp"),
            ("CROWD_API_URL", "https://crowd"),
            ("CROWD_API_PASSWORD", "crowdpw"),
        ]))
        .unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("topsecret"));
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("crowdpw"));
    }
}
