//! CLI configuration.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. `<user config dir>/prgate/config.{yaml,toml}` if present
//! 3. The file given with `--config` / `PRGATE_CONFIG` (required if given)
//! 4. Environment variables prefixed `PRGATE__`, e.g.
//!    `PRGATE__GITHUB__APP_ID=123456` sets `github.app_id`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use prgate_github::auth::{AppId, EnvPrivateKey, FilePrivateKey, PrivateKeySource};
use prgate_github::client::ClientConfig;

use crate::ConfigError;

/// Top-level CLI settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub github: GitHubSettings,
    pub classification: ClassificationSettings,
    pub logging: LoggingSettings,
}

/// GitHub App identity and API access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// App ID or client ID
    pub app_id: Option<String>,
    /// PEM file holding the App's private key
    pub private_key_path: Option<PathBuf>,
    /// Environment variable holding the App's private key, used when no path is set
    pub private_key_env: Option<String>,
    pub api_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key_path: None,
            private_key_env: None,
            api_url: "https://api.github.com".to_string(),
            user_agent: concat!("prgate/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
        }
    }
}

impl GitHubSettings {
    /// The configured App ID.
    pub fn app_id(&self) -> Result<AppId, ConfigError> {
        let raw = self
            .app_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "github.app_id".to_string(),
            })?;
        Ok(AppId::new(raw)?)
    }

    /// Where the private key is read from. A file path wins over a variable.
    pub fn private_key_source(&self) -> Result<Arc<dyn PrivateKeySource>, ConfigError> {
        if let Some(path) = &self.private_key_path {
            return Ok(Arc::new(FilePrivateKey::new(path)));
        }
        if let Some(variable) = &self.private_key_env {
            return Ok(Arc::new(EnvPrivateKey::new(variable)));
        }
        Err(ConfigError::MissingRequired {
            key: "github.private_key_path".to_string(),
        })
    }

    /// HTTP client configuration derived from these settings.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        Ok(ClientConfig::builder()
            .user_agent(&self.user_agent)
            .github_api_url(&self.api_url)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()?)
    }
}

/// Path patterns deciding what a changed file touches.
///
/// Patterns are regular expressions matched against repository-relative paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    pub production_patterns: Vec<String>,
    pub release_note_patterns: Vec<String>,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            production_patterns: vec!["^src/".to_string()],
            release_note_patterns: vec![
                r"^(?i:CHANGELOG|RELEASE[-_]NOTES)(\.md)?$".to_string(),
                "^changes/".to_string(),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Default per-user configuration file stem, without extension.
pub fn default_config_stem() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("prgate").join("config"))
}

/// Load settings from the default location, `explicit_path` and the environment.
///
/// # Errors
///
/// Returns `ConfigError::Load` if `explicit_path` is missing or any source is
/// malformed.
pub fn load_settings(explicit_path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(stem) = default_config_stem() {
        if let Some(stem) = stem.to_str() {
            debug!(path = %stem, "Checking default configuration location");
            builder = builder.add_source(config::File::with_name(stem).required(false));
        }
    }

    if let Some(path) = explicit_path {
        info!(path = %path.display(), "Loading configuration from explicit path");
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix("PRGATE").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
