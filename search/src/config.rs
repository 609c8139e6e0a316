use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::Duration;
use config::{Config, ConfigError, Environment, File};
use gemini_core::config::{get_default_config_file, GeminiConfig};
use serde::{Deserialize, Serialize};

use crate::session::InMemorySessionStore;

pub const APP_NAME: &str = "gemini-search";
pub const ENV_PREFIX: &str = "GEMINI_SEARCH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub gemini: GeminiConfig,
    pub sessions: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            gemini: GeminiConfig::default(),
            sessions: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of live sessions before the least recently used is evicted
    pub capacity: usize,
    /// Idle time after which a session is dropped; 0 keeps sessions until evicted
    pub idle_ttl_secs: u64,
    /// How often expired sessions are swept
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            capacity: 1000,
            idle_ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Option<Duration> {
        (self.idle_ttl_secs > 0).then(|| Duration::seconds(self.idle_ttl_secs as i64))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn build_store(&self) -> InMemorySessionStore {
        InMemorySessionStore::new(self.capacity, self.idle_ttl())
    }
}

impl AppConfig {
    /// Loads an explicit TOML file (which must exist), then environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::build(Some(File::from(path).required(true)))
    }

    /// Loads `~/.config/gemini-search/config.toml` if present, then environment overrides.
    pub fn load_from_default() -> Result<Self, ConfigError> {
        let file = Self::default_path().map(|path| File::from(path).required(false));
        Self::build(file)
    }

    pub fn default_path() -> Option<PathBuf> {
        get_default_config_file(APP_NAME).ok()
    }

    fn build<S>(file: Option<S>) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
