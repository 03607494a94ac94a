//! Configuration management for powchain

use serde::Deserialize;
use thiserror::Error;

use std::fs;
use std::path::Path;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level node configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Parameters handed to the ledger at construction
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Address credited with mining rewards
    #[serde(default = "default_owner_address")]
    pub owner_address: String,
    /// Leading zero hex characters required of a block hash
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: f64,
    /// `log` target the ledger writes its records under
    #[serde(default = "default_log_target")]
    pub log_target: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            owner_address: default_owner_address(),
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
            log_target: default_log_target(),
        }
    }
}

impl LedgerConfig {
    /// Builds a ledger config for the given owner, keeping other defaults
    pub fn for_owner(owner_address: impl Into<String>) -> Self {
        Self {
            owner_address: owner_address.into(),
            ..Self::default()
        }
    }

    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner_address.is_empty() {
            return Err(ConfigError::Invalid(
                "ledger.owner_address must be set".to_string(),
            ));
        }

        // A SHA-256 digest has 64 hex characters.
        if self.difficulty > 64 {
            return Err(ConfigError::Invalid(format!(
                "ledger.difficulty must be at most 64, got {}",
                self.difficulty
            )));
        }

        if !self.mining_reward.is_finite() || self.mining_reward <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "ledger.mining_reward must be a positive number, got {}",
                self.mining_reward
            )));
        }

        Ok(())
    }
}

impl Config {
    /// Parses configuration from TOML text and validates it
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                Self::from_toml_str(&text)
            }
            None => {
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".to_string()));
        }

        self.ledger.validate()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_owner_address() -> String {
    "my_blockchain_address".to_string()
}

fn default_difficulty() -> usize {
    3
}

fn default_mining_reward() -> f64 {
    1.0
}

fn default_log_target() -> String {
    "blockchain".to_string()
}
