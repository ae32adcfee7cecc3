use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DEFAULT_API_BASE_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid api_base_url '{0}'")]
    InvalidBaseUrl(String),
    #[error("invalid colour '{0}', expected #rrggbb")]
    InvalidColour(String),
}

/// Runtime settings handed to the core by the shell. Every field has a
/// default, so a shell may send a partial document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Non-JSON error bodies at or above this many characters are not shown.
    pub error_text_limit: usize,
    pub placeholder: PlaceholderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            error_text_limit: 500,
            placeholder: PlaceholderConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::capabilities::ValidatedUrl::new(self.api_base_url.as_str())
            .map_err(|_| ConfigError::InvalidBaseUrl(self.api_base_url.clone()))?;
        self.placeholder.fill_rgb()?;
        self.placeholder.ink_rgb()?;
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub width: u32,
    pub height: u32,
    pub fill: String,
    pub ink: String,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            fill: "#e9ecef".to_string(),
            ink: "#6c757d".to_string(),
        }
    }
}

impl PlaceholderConfig {
    pub fn fill_rgb(&self) -> Result<[u8; 3], ConfigError> {
        parse_hex_colour(&self.fill)
    }

    pub fn ink_rgb(&self) -> Result<[u8; 3], ConfigError> {
        parse_hex_colour(&self.ink)
    }
}

fn parse_hex_colour(raw: &str) -> Result<[u8; 3], ConfigError> {
    let invalid = || ConfigError::InvalidColour(raw.to_string());
    let hex = raw.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}
