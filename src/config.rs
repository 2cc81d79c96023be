//! Configuration management for Quantum Chat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{QuantumError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Quantum Chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Conversation behavior
    #[serde(default)]
    pub chat: ChatConfig,

    /// Where persisted state lives
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Full URL of the OpenAI-compatible chat completions endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used when no model has been selected and saved
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature sent with every request
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion length cap sent with every request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Optional request timeout in seconds; unset means wait indefinitely
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Fallback API key, used only when no key has been saved in settings
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: None,
            api_key: None,
        }
    }
}

/// Conversation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System message placed at the head of every new thread
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum session title length, ellipsis included
    #[serde(default = "default_title_max_length")]
    pub title_max_length: usize,
}

fn default_system_prompt() -> String {
    "You are an intelligent, helpful AI assistant built on an open-source model. \
     Your name is Quantum AI. Your responses should be concise, helpful, and \
     formatted using Markdown if necessary."
        .to_string()
}

fn default_title_max_length() -> usize {
    50
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            title_max_length: default_title_max_length(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory override; defaults to the platform data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::info!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QuantumError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| QuantumError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(endpoint) = std::env::var("QUANTUM_ENDPOINT") {
            self.api.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("QUANTUM_MODEL") {
            self.api.default_model = model;
        }

        if let Ok(key) = std::env::var("QUANTUM_API_KEY") {
            if !key.trim().is_empty() {
                self.api.api_key = Some(key.trim().to_string());
            }
        }

        if let Ok(temperature) = std::env::var("QUANTUM_TEMPERATURE") {
            if let Ok(value) = temperature.parse() {
                self.api.temperature = value;
            } else {
                tracing::warn!("Invalid QUANTUM_TEMPERATURE: {}", temperature);
            }
        }

        if let Ok(max_tokens) = std::env::var("QUANTUM_MAX_TOKENS") {
            if let Ok(value) = max_tokens.parse() {
                self.api.max_tokens = value;
            } else {
                tracing::warn!("Invalid QUANTUM_MAX_TOKENS: {}", max_tokens);
            }
        }

        if let Ok(timeout) = std::env::var("QUANTUM_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = Some(value);
            } else {
                tracing::warn!("Invalid QUANTUM_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(dir) = std::env::var("QUANTUM_DATA_DIR") {
            tracing::debug!(data_dir = %dir, "Env override: QUANTUM_DATA_DIR");
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(dir) = &cli.data_dir {
            self.storage.data_dir = Some(dir.clone());
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any setting is out of range
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.api.endpoint).map_err(|e| {
            QuantumError::Config(format!("Invalid endpoint '{}': {}", self.api.endpoint, e))
        })?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(QuantumError::Config(format!(
                "Endpoint must be http or https, got '{}'",
                endpoint.scheme()
            ))
            .into());
        }

        if self.api.default_model.trim().is_empty() {
            return Err(QuantumError::Config("Default model cannot be empty".to_string()).into());
        }

        if !(0.0..=2.0).contains(&self.api.temperature) {
            return Err(QuantumError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.api.temperature
            ))
            .into());
        }

        if self.api.max_tokens == 0 {
            return Err(
                QuantumError::Config("max_tokens must be greater than 0".to_string()).into(),
            );
        }

        if self.api.timeout_seconds == Some(0) {
            return Err(QuantumError::Config(
                "timeout_seconds must be greater than 0 when set".to_string(),
            )
            .into());
        }

        // Room for at least one character plus the ellipsis.
        if self.chat.title_max_length < 4 {
            return Err(QuantumError::Config(format!(
                "title_max_length must be at least 4, got {}",
                self.chat.title_max_length
            ))
            .into());
        }

        if self.chat.system_prompt.trim().is_empty() {
            return Err(QuantumError::Config("System prompt cannot be empty".to_string()).into());
        }

        Ok(())
    }
}
