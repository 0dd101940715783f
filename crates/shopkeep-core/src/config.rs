use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ShopkeepError};

/// Top-level configuration for the Shopkeep service.
///
/// Loaded from `~/.shopkeep/config.toml` by default. Every section falls back
/// to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopkeepConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub generative: GenerativeConfig,
}

impl ShopkeepConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShopkeepConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Reject values that would make every turn fail.
    pub fn validate(&self) -> Result<()> {
        if self.chat.catalog_timeout_secs == 0 {
            return Err(ShopkeepError::Config(
                "chat.catalog_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.generative.timeout_secs == 0 {
            return Err(ShopkeepError::Config(
                "generative.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ShopkeepError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.shopkeep/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Chat turn pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Whether the chat endpoint accepts messages.
    pub enabled: bool,
    /// Maximum accepted message length in characters.
    pub max_message_length: usize,
    /// Rows requested from the catalog per product search.
    pub search_fetch_limit: usize,
    /// Products listed in a search reply.
    pub search_display_limit: usize,
    /// Categories included in the generative context digest.
    pub context_category_limit: usize,
    /// Sample products included in the generative context digest.
    pub context_product_limit: usize,
    /// Upper bound on a single catalog read made during a turn.
    pub catalog_timeout_secs: u64,
}

impl ChatConfig {
    /// Catalog read deadline, never shorter than one second.
    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_secs.max(1))
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_message_length: 2000,
            search_fetch_limit: 10,
            search_display_limit: 5,
            context_category_limit: 5,
            context_product_limit: 5,
            catalog_timeout_secs: 3,
        }
    }
}

/// External generative model settings.
///
/// Without an `api_key` the generative fallback stays unavailable and
/// unmatched messages receive a deterministic reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// Base URL of the `models/{model}:generateContent` API.
    pub endpoint: String,
    /// Upper bound on a single generation call.
    pub timeout_secs: u64,
}

impl GenerativeConfig {
    /// The configured credential, ignoring blank values.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Generation deadline, never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 8,
        }
    }
}
