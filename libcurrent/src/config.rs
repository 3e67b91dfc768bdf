//! Configuration management for Current
//!
//! Configuration is read once from a TOML file, overlaid with `CRNT_*`
//! environment variables and then passed explicitly to the services.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Default Bluesky XRPC endpoint.
pub const DEFAULT_XRPC_URL: &str = "https://bsky.social/xrpc/";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bluesky: Option<BlueskyConfig>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Credentials and endpoint for federating posts to Bluesky
#[derive(Debug, Deserialize)]
pub struct BlueskyConfig {
    pub handle: String,
    #[serde(deserialize_with = "deserialize_secret")]
    pub app_password: SecretString,
    #[serde(default = "default_xrpc_url")]
    pub xrpc_url: String,
    #[serde(default = "default_true")]
    pub strip_emphasis: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BlueskyConfig {
    /// Create a configuration with default endpoint and parser settings
    pub fn new(handle: impl Into<String>, app_password: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            app_password: SecretString::from(app_password.into()),
            xrpc_url: default_xrpc_url(),
            strip_emphasis: true,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// XRPC base URL, always ending with a slash so method names can be appended
    pub fn xrpc_base(&self) -> String {
        if self.xrpc_url.ends_with('/') {
            self.xrpc_url.clone()
        } else {
            format!("{}/", self.xrpc_url)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub federate: bool,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            federate: false,
            page_size: default_page_size(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn default_xrpc_url() -> String {
    DEFAULT_XRPC_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    10
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file falls back to [`Config::default_config`]; environment
    /// overrides are applied in both cases.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            Self::default_config()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/current/posts.db".to_string(),
            },
            bluesky: None,
            defaults: DefaultsConfig::default(),
        }
    }

    /// Overlay `CRNT_SQLITE_FILEPATH`, `CRNT_BSKY_HANDLE` and `CRNT_BSKY_APP_PASS`
    ///
    /// Bluesky credentials from the environment only create a `[bluesky]`
    /// section when both handle and app password are present.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = env_non_empty("CRNT_SQLITE_FILEPATH") {
            self.database.path = path;
        }

        let handle = env_non_empty("CRNT_BSKY_HANDLE");
        let app_password = env_non_empty("CRNT_BSKY_APP_PASS");

        if let Some(bluesky) = self.bluesky.as_mut() {
            if let Some(handle) = handle {
                bluesky.handle = handle;
            }
            if let Some(app_password) = app_password {
                bluesky.app_password = SecretString::from(app_password);
            }
        } else if let (Some(handle), Some(app_password)) = (handle, app_password) {
            self.bluesky = Some(BlueskyConfig::new(handle, app_password));
        }
    }

    /// Bluesky settings, required when a post is federated
    pub fn bluesky(&self) -> Result<&BlueskyConfig> {
        self.bluesky
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField("bluesky".to_string()).into())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CRNT_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("current").join("config.toml"))
}
