//! Registry construction from configuration.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use wayfarer_config::ToolsConfig;
use wayfarer_core::registry::{RegistryError, ToolRegistry};

use crate::attractions::AttractionSearchTool;
use crate::weather::WeatherTool;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ToolBuildError {
    #[error("HTTP client build error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("environment variable '{0}' is not set")]
    MissingApiKey(String),
    #[error("tool registration error: {0}")]
    Registry(#[from] RegistryError),
}

/// Build the registry of enabled tools.
///
/// The search API key is read from the configured environment variable
/// here, once, so a missing key fails at startup rather than mid-task.
pub fn build_registry(
    config: &ToolsConfig,
    invoke_timeout: Duration,
) -> Result<ToolRegistry, ToolBuildError> {
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(invoke_timeout)
        .build()?;

    let mut registry = ToolRegistry::new();
    if config.weather.enabled {
        registry.register(Arc::new(WeatherTool::new(
            client.clone(),
            config.weather.base_url.clone(),
        )))?;
    }
    if config.attractions.enabled {
        let api_key = env::var(&config.attractions.api_key_env)
            .map_err(|_| ToolBuildError::MissingApiKey(config.attractions.api_key_env.clone()))?;
        registry.register(Arc::new(AttractionSearchTool::new(
            client,
            config.attractions.endpoint.clone(),
            api_key,
            config.attractions.max_results,
        )))?;
    }

    tracing::info!(tools = registry.len(), "tool registry built");
    Ok(registry)
}
