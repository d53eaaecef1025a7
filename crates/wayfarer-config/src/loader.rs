//! Configuration loading and validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::WayfarerConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load the full Wayfarer configuration from a YAML file.
///
/// An empty file yields the defaults.
pub fn load_config(path: &Path) -> Result<WayfarerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = if content.trim().is_empty() {
        WayfarerConfig::default()
    } else {
        serde_yaml::from_str(&content)?
    };
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &WayfarerConfig) -> Result<(), ConfigError> {
    if config.app.name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "app.name must not be empty".to_string(),
        ));
    }

    if config.engine.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "engine.max_attempts must be > 0".to_string(),
        ));
    }

    if config.engine.invoke_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "engine.invoke_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.engine.max_steps == 0 {
        return Err(ConfigError::Invalid(
            "engine.max_steps must be > 0".to_string(),
        ));
    }

    if config.tools.weather.enabled && config.tools.weather.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "tools.weather.base_url must not be empty".to_string(),
        ));
    }

    if config.tools.attractions.enabled {
        if config.tools.attractions.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "tools.attractions.endpoint must not be empty".to_string(),
            ));
        }
        if config.tools.attractions.api_key_env.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "tools.attractions.api_key_env must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
