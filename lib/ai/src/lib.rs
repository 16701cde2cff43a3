//! Model-call primitives for promptline.
//!
//! This crate provides:
//!
//! - **Backend**: the transport trait and the provider-neutral request and
//!   response shapes, with a Gemini implementation
//! - **Schema**: declarative output schemas used both to instruct the model
//!   and to validate what it returns
//! - **LLM Call**: a single instruction + content + schema invocation
//!
//! Pipelines, routers and tool loops are built on top of [`LlmCall`].

pub mod backend;
pub mod error;
pub mod gemini;
pub mod llm_call;
pub mod mock;
pub mod schema;

pub use backend::{
    Content, FunctionCall, FunctionDeclaration, FunctionResponse, ModelBackend, ModelRequest,
    ModelResponse, OutputFormat, Part, Role, TokenUsage,
};
pub use error::ModelError;
pub use gemini::{GeminiBackend, GeminiConfig};
pub use llm_call::{LlmCall, LlmCallResult, parse_json, parse_structured};
pub use mock::MockBackend;
pub use schema::{Field, FieldType, SchemaDescriptor, StructuredOutput, Violation};
