//! Server configuration.
//!
//! Created once at startup, never mutated afterwards and shared read-only
//! by every producer. Values come from built-in defaults, then an optional
//! TOML file, then command-line flags.

use crate::transform::Rotation;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete process configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub stream: StreamConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host name or IP address to bind the server to.
    pub listen: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Device selection and best-effort device settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index.
    pub device: u32,
    /// Fixed focus value, or -1 to leave autofocus on.
    pub manual_focus: i32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: 0,
            manual_focus: -1,
        }
    }
}

/// Per-frame processing applied by every producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub rotate: Rotation,
    /// JPEG quality, 0 to 100.
    pub quality: u8,
    /// Target frames per second for `/stream`; 0 means unlimited.
    pub framerate: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            flip_horizontal: false,
            flip_vertical: false,
            rotate: Rotation::None,
            quality: 90,
            framerate: 60,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("listen address is empty")]
    EmptyListen,
    #[error("invalid jpeg quality {0} (must be 0-100)")]
    InvalidQuality(u8),
    #[error("invalid manual focus {0} (must be -1 for auto or a non-negative value)")]
    InvalidFocus(i32),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

impl Config {
    /// Loads configuration from a TOML file; missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.trim().is_empty() {
            return Err(ConfigError::EmptyListen);
        }
        if self.stream.quality > 100 {
            return Err(ConfigError::InvalidQuality(self.stream.quality));
        }
        if self.capture.manual_focus < -1 {
            return Err(ConfigError::InvalidFocus(self.capture.manual_focus));
        }
        Ok(())
    }

    /// Host and port the HTTP server binds to. Host names are resolved at
    /// bind time.
    pub fn bind_addr(&self) -> (&str, u16) {
        (self.server.listen.as_str(), self.server.port)
    }
}
