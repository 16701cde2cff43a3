//! Centralized demo configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, e.g. `GEMINI__MODEL` or `TOOLS__WEATHER_BASE_URL`.

use promptline_ai::GeminiConfig;
use promptline_tools::{knowledge_base, weather};
use serde::Deserialize;
use std::path::PathBuf;

/// Demo configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct DemoConfig {
    /// Gemini API key.
    pub google_api_key: String,

    /// Model selection and transport settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Settings for the function-calling tools.
    #[serde(default)]
    pub tools: ToolSettings,
}

/// Tool-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSettings {
    /// Base URL of the Open-Meteo API.
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    /// Path of the knowledge-base JSON file.
    #[serde(default = "default_knowledge_base_path")]
    pub knowledge_base_path: PathBuf,
}

fn default_weather_base_url() -> String {
    weather::DEFAULT_BASE_URL.to_string()
}

fn default_knowledge_base_path() -> PathBuf {
    PathBuf::from(knowledge_base::DEFAULT_PATH)
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            weather_base_url: default_weather_base_url(),
            knowledge_base_path: default_knowledge_base_path(),
        }
    }
}

impl DemoConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
