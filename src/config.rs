//! Configuration parsing and validation for chat-relay.
//!
//! Every field has a compiled-in default, so running without a config file
//! serves the built-in model table on the default port. A TOML file only
//! needs to name the sections it wants to change.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Default system prompt injected when a conversation lacks one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI assistant running locally on ai.meng.zip \
infrastructure using modest hardware resources. Current date: Sunday, August 24, 2025. Provide \
complete, accurate information in concise responses - include all necessary details but keep \
explanations brief and well-structured to optimize performance. Be direct and efficient while \
ensuring your answers are fully helpful.";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_models")]
    pub models: Vec<ModelConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            relay: RelayConfig::default(),
            logging: LoggingConfig::default(),
            models: default_models(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:5000")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Settings applied to every upstream request.
///
/// `max_tokens` and `temperature` replace whatever the client sent.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f64 {
    0.7
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A routable model and the metadata shown to clients.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Identifier clients put in the `model` field
    pub id: String,
    /// Full chat-completions URL of the upstream
    pub endpoint: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ModelConfig {
    fn builtin(id: &str, endpoint: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            endpoint: endpoint.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

fn default_models() -> Vec<ModelConfig> {
    vec![
        ModelConfig::builtin(
            "qwen3",
            "http://192.168.129.107:8004/v1/chat/completions",
            "Qwen3-0.6B",
            "Fast Thinking",
        ),
        ModelConfig::builtin(
            "lfm2",
            "http://192.168.129.109:8004/v1/chat/completions",
            "LFM2-VL-1.6B-Q4_0",
            "Fast",
        ),
        ModelConfig::builtin(
            "phi4",
            "http://192.168.129.111:8004/v1/chat/completions",
            "Phi-4-4B",
            "Good Responses",
        ),
        ModelConfig::builtin(
            "gemma",
            "http://192.168.129.110:8004/v1/chat/completions",
            "Gemma-3-4B",
            "Best Responses",
        ),
    ]
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Load from `path` if given, otherwise use the compiled-in defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Non-fatal problems worth logging once tracing is up.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.models.is_empty() {
            warnings.push("No models configured - proxy will reject all chat requests".to_string());
        }
        warnings
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.relay.temperature.is_finite() {
            return Err(ConfigError::Validation(
                "relay.temperature must be a finite number".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.is_empty() {
                return Err(ConfigError::Validation(
                    "Model with empty id".to_string(),
                ));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Model '{}' is defined more than once",
                    model.id
                )));
            }
            if model.endpoint.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Model '{}' has empty endpoint",
                    model.id
                )));
            }
            if !(model.endpoint.starts_with("http://") || model.endpoint.starts_with("https://"))
            {
                return Err(ConfigError::Validation(format!(
                    "Model '{}' endpoint must be an http(s) URL: {}",
                    model.id, model.endpoint
                )));
            }
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
