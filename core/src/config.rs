use crate::errors::{GeminiError, GeminiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted, in order, when no API key is configured.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Configuration struct for Gemini API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub system_prompt: Option<String>,
    /// Override for the REST base URL, e.g. a local stub.
    pub api_base: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: Some(DEFAULT_MODEL.to_string()),
            system_prompt: None,
            api_base: None,
        }
    }
}

impl GeminiConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> GeminiResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| GeminiError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| GeminiError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            system_prompt: other
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            api_base: other.api_base.clone().or_else(|| self.api_base.clone()),
        }
    }

    /// The configured key, falling back to the process environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .filter_map(|name| env::var(name).ok())
                    .find(|key| !key.trim().is_empty())
            })
    }

    pub fn model(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> GeminiResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        GeminiError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> GeminiResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeminiConfig::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, GeminiConfig::default());
        assert_eq!(config.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model_name = \"gemini-2.0-flash\"").unwrap();
        writeln!(file, "api_base = \"http://127.0.0.1:9999/v1beta/\"").unwrap();

        let config = GeminiConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.model(), "gemini-2.0-flash");
        assert_eq!(config.base_url(), "http://127.0.0.1:9999/v1beta");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model_name = [").unwrap();

        let result = GeminiConfig::load_from_file(file.path());
        assert!(matches!(result, Err(GeminiError::ConfigError(_))));
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = GeminiConfig {
            api_key: Some("base-key".to_string()),
            ..GeminiConfig::default()
        };
        let overrides = GeminiConfig {
            api_key: None,
            model_name: Some("override-model".to_string()),
            system_prompt: Some("Be brief.".to_string()),
            api_base: None,
        };

        let merged = base.merge(&overrides);
        assert_eq!(merged.api_key.as_deref(), Some("base-key"));
        assert_eq!(merged.model(), "override-model");
        assert_eq!(merged.system_prompt.as_deref(), Some("Be brief."));
    }

    #[test]
    fn test_explicit_key_wins() {
        let config = GeminiConfig {
            api_key: Some("explicit".to_string()),
            ..GeminiConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("explicit"));
    }
}
