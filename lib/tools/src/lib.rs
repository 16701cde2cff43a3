//! Function calling for promptline.
//!
//! This crate provides:
//!
//! - **Tools**: the weather and knowledge-base callables
//! - **Tool Registry**: name-based dispatch with argument checking
//! - **Tool Caller**: one round of model-requested tool use

pub mod caller;
pub mod error;
pub mod knowledge_base;
pub mod tool;
pub mod weather;

pub use caller::{DEFAULT_INSTRUCTION, ToolCaller};
pub use error::ToolError;
pub use knowledge_base::KnowledgeBaseTool;
pub use tool::{Callable, ToolDefinition, ToolRegistry};
pub use weather::WeatherTool;
