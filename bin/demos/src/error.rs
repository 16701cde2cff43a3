//! Errors surfaced by the demo binaries.

use promptline_ai::ModelError;
use promptline_tools::ToolError;
use rootcause::Report;
use std::fmt;

/// Anything that can stop a demo.
#[derive(Debug, Clone)]
pub enum DemoError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// A model call failed.
    Model(ModelError),
    /// The tool loop failed.
    Tool(ToolError),
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::Tool(e) => write!(f, "tool error: {e}"),
        }
    }
}

impl std::error::Error for DemoError {}

impl From<config::ConfigError> for DemoError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config {
            details: e.to_string(),
        }
    }
}

impl From<ModelError> for DemoError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<ToolError> for DemoError {
    fn from(e: ToolError) -> Self {
        Self::Tool(e)
    }
}

/// Wraps a library report in a demo report, keeping it as the cause.
pub fn lift<C>(report: Report<C>) -> Report<DemoError>
where
    C: Clone + Into<DemoError> + fmt::Display + fmt::Debug + Send + Sync + 'static,
{
    let error: DemoError = report.current_context().clone().into();
    report.context(error)
}
