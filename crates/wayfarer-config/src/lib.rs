//! # Wayfarer Config
//!
//! Unified single-file configuration for Wayfarer. A single `wayfarer.yaml`
//! can configure the app identity, engine limits, and tool endpoints. Every
//! field is defaulted, so an empty or absent file is a valid configuration.

mod loader;

pub use loader::{load_config, ConfigError};

use serde::Deserialize;

/// Top-level configuration schema for Wayfarer.
#[derive(Debug, Clone, Deserialize)]
pub struct WayfarerConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for WayfarerConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            engine: EngineConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_app_name() -> String {
    "wayfarer".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Limits for the step execution loop.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Total invocation attempts per step, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Per-invocation timeout imposed by the registry.
    #[serde(default = "default_invoke_timeout_ms")]
    pub invoke_timeout_ms: u64,
    /// Step budget per task.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            invoke_timeout_ms: default_invoke_timeout_ms(),
            max_steps: default_max_steps(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}

fn default_invoke_timeout_ms() -> u64 {
    10_000
}

fn default_max_steps() -> usize {
    5
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub attractions: AttractionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_weather_base_url(),
        }
    }
}

fn default_weather_base_url() -> String {
    "https://wttr.in".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttractionsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_attractions_endpoint")]
    pub endpoint: String,
    /// Environment variable holding the search API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for AttractionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_attractions_endpoint(),
            api_key_env: default_api_key_env(),
            max_results: default_max_results(),
        }
    }
}

fn default_attractions_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_api_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_max_results() -> u32 {
    5
}

fn default_true() -> bool {
    true
}
