//! Session storage configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the persisted session lives and which cookies are visible to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JSON key-value storage file holding the persisted session
    pub storage_path: PathBuf,
    /// Raw cookie header (`name=value; other=value`) consulted as the last token source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            cookie: None,
        }
    }
}

/// `$HOME/.easydeploy/storage.json`, or `.easydeploy/storage.json` when HOME is unset.
pub fn default_storage_path() -> PathBuf {
    let base = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(".easydeploy").join("storage.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_defaults() {
        let config = AuthConfig::default();
        assert!(config.storage_path.ends_with(".easydeploy/storage.json"));
        assert!(config.cookie.is_none());
    }

    #[test]
    fn test_auth_config_parse() {
        let config: AuthConfig = toml::from_str(
            r#"
            storage_path = "/tmp/session.json"
            cookie = "auth_token=abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage_path, PathBuf::from("/tmp/session.json"));
        assert_eq!(config.cookie.as_deref(), Some("auth_token=abc"));
    }
}
