use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{Error, Result};
use crate::feed::retry::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "feed-relay.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between refresh passes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Seconds to wait before the fallback fetch.
    #[serde(default = "default_fallback_delay")]
    pub fallback_delay: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_token_check_url")]
    pub token_check_url: String,

    #[serde(default = "default_token_check_timeout")]
    pub token_check_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub json_format: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|_| Error::NotFound(path.as_ref().display().to_string()))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the default file when present, or the built-in
    /// defaults; environment overrides are applied last.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.settings.refresh_interval == 0 {
            return Err(Error::Config("Refresh interval must be greater than 0".to_string()));
        }

        if self.settings.max_attempts == 0 {
            return Err(Error::Config("Max attempts must be at least 1".to_string()));
        }

        if self.settings.backoff_multiplier < 1.0 {
            return Err(Error::Config("Backoff multiplier must be at least 1.0".to_string()));
        }

        if self.server.port == 0 {
            return Err(Error::Config("Port must be greater than 0".to_string()));
        }

        url::Url::parse(&self.server.token_check_url)
            .map_err(|_| Error::InvalidUrl(self.server.token_check_url.clone()))?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(interval) = std::env::var("FEED_RELAY_REFRESH_INTERVAL") {
            if let Ok(val) = interval.parse() {
                self.settings.refresh_interval = val;
            }
        }

        if let Ok(port) = std::env::var("FEED_RELAY_PORT") {
            if let Ok(val) = port.parse() {
                self.server.port = val;
            }
        }

        if let Ok(url) = std::env::var("FEED_RELAY_TOKEN_URL") {
            self.server.token_check_url = url;
        }

        if let Ok(level) = std::env::var("FEED_RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(dir) = std::env::var("FEED_RELAY_CACHE_DIR") {
            self.storage.cache_dir = PathBuf::from(dir);
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.settings)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.settings.refresh_interval)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("feed-relay"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            fallback_delay: default_fallback_delay(),
            max_attempts: default_max_attempts(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff: default_max_backoff(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            token_check_url: default_token_check_url(),
            token_check_timeout: default_token_check_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_to_file: false,
            log_file: default_log_file(),
            json_format: false,
        }
    }
}

fn default_refresh_interval() -> u64 { 3 * 60 * 60 }
fn default_fallback_delay() -> u64 { 20 }
fn default_max_attempts() -> usize { 2 }
fn default_backoff_multiplier() -> f64 { 1.0 }
fn default_max_backoff() -> u64 { 300 }
fn default_user_agent() -> String {
    format!("feed-relay/{}", env!("CARGO_PKG_VERSION"))
}
fn default_timeout() -> u64 { 30 }

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_token_check_url() -> String { "http://localhost:9000/checkToken".to_string() }
fn default_token_check_timeout() -> u64 { 5 }

fn default_registry_path() -> PathBuf { PathBuf::from("config/feeds.yml") }
fn default_cache_dir() -> PathBuf { PathBuf::from(".") }

fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> String { "logs/feed-relay.log".to_string() }
