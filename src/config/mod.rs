//! Configuration management

use crate::protocol::MAX_MESSAGE_SIZE;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the listening port
pub const PORT_ENV: &str = "PORT";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// TCP port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-connection relay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Messages queued per connection before a lagging subscriber is evicted
    pub outbound_buffer: usize,

    /// Largest inbound text message accepted, in bytes
    pub max_message_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl Config {
    /// Load config from a file, or the default location, then apply the environment
    ///
    /// An explicit path must exist. The default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(std::env::var(PORT_ENV).ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Reject values the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.relay.outbound_buffer > 0,
            "relay.outbound_buffer must be at least 1"
        );
        Ok(())
    }

    /// Apply a `PORT` value taken from the environment
    pub fn apply_env(&mut self, port: Option<&str>) -> Result<()> {
        if let Some(port) = port {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} value: {:?}", PORT_ENV, port))?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arena-relay")
            .join("config.toml")
    }
}
