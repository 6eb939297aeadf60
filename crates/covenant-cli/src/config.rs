//! Configuration management for the CLI.
//!
//! Read from `~/.covenant/config.toml` unless `--config` names another file:
//!
//! ```toml
//! [extractor]
//! chunk_size = 60000
//! chunk_overlap = 4000
//!
//! [model]
//! model = "claude-sonnet-4-20250514"
//! api_key_env = "ANTHROPIC_API_KEY"
//!
//! [settings]
//! color = true
//! format = "table"
//! ```

use crate::error::{CliError, Result};
use covenant_extractor::ExtractorConfig;
use covenant_llm::AnthropicClient;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Model used when the config file names none
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Extraction engine settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Extraction model settings
    #[serde(default)]
    pub model: ModelSettings,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Extraction model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model identifier, also used for cost accounting
    #[serde(default = "default_model")]
    pub model: String,

    /// Alternative API endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".covenant").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.extractor.validate()?;
        Ok(config)
    }
}

impl ModelSettings {
    /// Build the model client, reading the key from `api_key_env`.
    pub fn client(&self) -> Result<AnthropicClient> {
        let key = std::env::var(&self.api_key_env)
            .map_err(|_| CliError::Config(format!("{} is not set", self.api_key_env)))?;
        let client = AnthropicClient::new(key, self.model.clone())?;
        Ok(match &self.endpoint {
            Some(endpoint) => client.with_endpoint(endpoint.clone()),
            None => client,
        })
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.extractor, ExtractorConfig::default());
        assert_eq!(config.model.model, DEFAULT_MODEL);
        assert_eq!(config.model.api_key_env, "ANTHROPIC_API_KEY");
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[extractor]\nchunk_size = 20000\n\n[settings]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.extractor.chunk_size, 20000);
        assert_eq!(
            config.extractor.chunk_overlap,
            ExtractorConfig::default().chunk_overlap
        );
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert!(config.settings.color);
        assert_eq!(config.model.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_extractor_settings_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[extractor]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, CliError::Extractor(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_client_requires_key() {
        let settings = ModelSettings {
            api_key_env: "COVENANT_TEST_UNSET_KEY_VARIABLE".to_string(),
            ..ModelSettings::default()
        };
        assert!(matches!(settings.client(), Err(CliError::Config(_))));
    }
}
