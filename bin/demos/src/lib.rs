//! Shared setup for the promptline demo binaries.
//!
//! Every binary loads [`DemoConfig`] from the environment, creates one
//! Gemini backend and shares it with whatever pipeline it demonstrates.

pub mod config;
pub mod error;

pub use config::{DemoConfig, ToolSettings};
pub use error::{DemoError, lift};

use promptline_ai::{GeminiBackend, ModelBackend};
use promptline_core::Result;
use promptline_tools::{Callable, KnowledgeBaseTool, ToolRegistry, WeatherTool};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the tracing subscriber. Logs go to stderr so demo output on
/// stdout stays readable; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Loaded configuration and the shared model backend.
pub struct Demo {
    pub config: DemoConfig,
    pub backend: Arc<dyn ModelBackend>,
}

impl Demo {
    /// Loads configuration and creates the backend.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::Config`] if configuration is missing or the
    /// backend cannot be created.
    pub fn from_env() -> Result<Self, DemoError> {
        let config = DemoConfig::from_env().map_err(DemoError::from)?;
        tracing::info!(model = %config.gemini.model, "loaded configuration");

        let backend = GeminiBackend::new(config.google_api_key.clone(), config.gemini.clone())
            .map_err(lift)?;
        Ok(Self {
            config,
            backend: Arc::new(backend),
        })
    }

    /// The weather and knowledge-base tools, as configured.
    #[must_use]
    pub fn tool_registry(&self) -> ToolRegistry {
        tool_registry(&self.config.tools)
    }
}

/// Builds the registry of every known tool.
#[must_use]
pub fn tool_registry(settings: &ToolSettings) -> ToolRegistry {
    ToolRegistry::new()
        .with(Callable::Weather(WeatherTool::new(
            settings.weather_base_url.clone(),
        )))
        .with(Callable::KnowledgeBase(KnowledgeBaseTool::new(
            settings.knowledge_base_path.clone(),
        )))
}

/// Prints a failed run's report and maps the result to an exit code.
#[must_use]
pub fn exit(result: Result<(), DemoError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("Error: {report}");
            ExitCode::FAILURE
        }
    }
}
