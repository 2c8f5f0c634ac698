//! Configuration loading from portal.toml.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const BACKEND_URL_VAR: &str = "PORTAL_BACKEND_URL";
pub const BASE_PATH_VAR: &str = "PORTAL_BASE_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Authentication backend.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Application shell.
    #[serde(default)]
    pub app: AppConfig,
}

/// Where the portal API lives.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Prefix the portal is mounted under, e.g. `/portal`.
    #[serde(default)]
    pub base_path: String,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise start from defaults. Environment
    /// overrides are applied either way.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PORTAL_*` overrides read through `lookup`.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(BACKEND_URL_VAR) {
            self.backend.base_url = url;
        }
        if let Some(base) = lookup(BASE_PATH_VAR) {
            self.app.base_path = base;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.backend.base_url.clone()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("backend.base_url must be an http(s) URL, got {0:?}")]
    InvalidBaseUrl(String),

    #[error("backend.timeout_secs must be greater than zero")]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert!(config.app.base_path.is_empty());
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            [backend]
            base_url = "https://portal.example.org/api"
            timeout_secs = 3

            [app]
            base_path = "/portal"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "https://portal.example.org/api");
        assert_eq!(config.backend.timeout_secs, 3);
        assert_eq!(config.app.base_path, "/portal");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::parse("[backend]\nbase_url = \"ftp://x\""),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            Config::parse("[backend]\ntimeout_secs = 0"),
            Err(ConfigError::ZeroTimeout)
        ));
        assert!(matches!(
            Config::parse("[backend]\nmodel = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_env(|key| match key {
                BACKEND_URL_VAR => Some("http://127.0.0.1:9000".into()),
                BASE_PATH_VAR => Some("/members".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.app.base_path, "/members");

        let err = Config::default()
            .with_env(|key| (key == BACKEND_URL_VAR).then(|| "nope".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app]\nbase_path = \"/portal\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.app.base_path, "/portal");
        assert_eq!(config.backend, BackendConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::Io(_))));
    }
}
