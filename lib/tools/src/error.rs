//! Error types for the tools crate.
//!
//! Errors are designed for layered context using rootcause. Tool execution
//! and the tool-invocation loop both return `Report<ToolError>`.

use promptline_ai::ModelError;
use std::fmt;

/// Errors from tool lookup, execution, or the invocation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The model asked for a function that was never declared.
    UnknownTool { name: String },
    /// Arguments do not match the tool's declared parameters.
    InvalidArguments { name: String, reason: String },
    /// Tool execution failed.
    ExecutionFailed { name: String, reason: String },
    /// A model call inside the loop failed.
    Model(ModelError),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { name } => write!(f, "function {name} not found"),
            Self::InvalidArguments { name, reason } => {
                write!(f, "invalid arguments for tool '{name}': {reason}")
            }
            Self::ExecutionFailed { name, reason } => {
                write!(f, "tool '{name}' execution failed: {reason}")
            }
            Self::Model(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ToolError {}

impl ToolError {
    /// Returns the model error if this error wraps one.
    #[must_use]
    pub fn as_model_error(&self) -> Option<&ModelError> {
        match self {
            Self::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for ToolError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}
