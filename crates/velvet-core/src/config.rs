use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Velvet assistant.
///
/// Loaded from `~/.velvet/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VelvetConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub geo: GeoConfig,
}

impl VelvetConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VelvetConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
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
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// API server port.
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// City used when the caller does not supply one.
    pub default_city: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            port: 4040,
            log_level: "info".to_string(),
            default_city: "Dubai".to_string(),
        }
    }
}

/// Assistant engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Whether the assistant endpoint is enabled.
    pub enabled: bool,
    /// Maximum message length in characters.
    pub max_message_length: usize,
    /// Delay between streamed tokens in milliseconds (typing effect).
    pub token_delay_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_message_length: 2000,
            token_delay_ms: 25,
        }
    }
}

/// Language model collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat-completions endpoint (OpenAI-compatible).
    pub endpoint: String,
    /// API key sent as a bearer token. Empty means unauthenticated.
    pub api_key: String,
    /// Model identifier passed through to the endpoint.
    pub model: String,
    /// Token budget for a single completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Total request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "llama3".to_string(),
            max_tokens: 512,
            temperature: 0.2,
            timeout_secs: 30,
        }
    }
}

/// Geo distance collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Distance-matrix style endpoint.
    pub endpoint: String,
    /// API key for the distance service. Empty means unauthenticated.
    pub api_key: String,
    /// Travel mode passed to the service.
    pub mode: String,
    /// Whether a straight-line estimate may be computed when the service
    /// fails and the destination carries coordinates.
    pub allow_fallback: bool,
    /// Total request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/distancematrix/json".to_string(),
            api_key: String::new(),
            mode: "driving".to_string(),
            allow_fallback: true,
            timeout_secs: 10,
        }
    }
}
