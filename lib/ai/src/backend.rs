//! Model backend abstraction.
//!
//! Provides a provider-neutral request/response model and the trait every
//! transport implements. The shapes follow the turn/part structure used by
//! the Gemini API so function calls and their results can be threaded
//! through a conversation unchanged.

use crate::error::ModelError;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;
use promptline_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User/human turn, including tool results sent back to the model.
    User,
    /// Model turn.
    Model,
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the requested function.
    pub name: String,
    /// Arguments as produced by the model.
    pub args: JsonValue,
}

/// The result of a function call, sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Name of the function that was called.
    pub name: String,
    /// The function's result.
    pub response: JsonValue,
}

/// One part of a conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced the turn.
    pub role: Role,
    /// The turn's parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// Creates a user turn with a single text part.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Creates a model turn with a single text part.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Creates a user turn carrying a function result.
    #[must_use]
    pub fn function_response(name: impl Into<String>, response: JsonValue) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::FunctionResponse(FunctionResponse {
                name: name.into(),
                response,
            })],
        }
    }

    /// Concatenates every text part.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns the first function call part, if any.
    #[must_use]
    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.parts.iter().find_map(|part| match part {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        })
    }

    /// Returns the first function response part, if any.
    #[must_use]
    pub fn function_response_part(&self) -> Option<&FunctionResponse> {
        self.parts.iter().find_map(|part| match part {
            Part::FunctionResponse(response) => Some(response),
            _ => None,
        })
    }
}

/// A function the model may ask to call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Function name.
    pub name: String,
    /// What the function does.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: JsonValue,
}

/// How the model should format its answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OutputFormat {
    /// Free text.
    #[default]
    Text,
    /// Any JSON document.
    Json,
    /// JSON conforming to a schema.
    Schema(SchemaDescriptor),
}

/// A request to a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRequest {
    /// System instruction, if any.
    pub system_instruction: Option<String>,
    /// Conversation turns, oldest first.
    pub contents: Vec<Content>,
    /// Requested output format.
    pub output: OutputFormat,
    /// Functions the model may call.
    pub tools: Vec<FunctionDeclaration>,
    /// Temperature for sampling.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_output_tokens: Option<u32>,
}

impl ModelRequest {
    /// Creates a request with a single user turn.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self::from_contents(vec![Content::user(prompt)])
    }

    /// Creates a request from an existing conversation.
    #[must_use]
    pub fn from_contents(contents: Vec<Content>) -> Self {
        Self {
            contents,
            ..Self::default()
        }
    }

    /// Adds a system instruction.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(system.into());
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// Declares functions the model may call.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<FunctionDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_output_tokens(mut self, max_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_tokens);
        self
    }

    /// The text of the last user turn.
    #[must_use]
    pub fn last_user_text(&self) -> Option<String> {
        self.contents
            .iter()
            .rev()
            .find(|c| c.role == Role::User)
            .map(Content::text)
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns the total number of tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A response from a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    /// The first candidate's turn.
    pub content: Content,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// Why generation stopped, as reported by the provider.
    pub finish_reason: Option<String>,
}

impl ModelResponse {
    /// Creates a text response.
    #[must_use]
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            content: Content::model(text),
            usage: TokenUsage::default(),
            model: model.into(),
            finish_reason: Some("STOP".to_string()),
        }
    }

    /// Creates a response holding a single function call.
    #[must_use]
    pub fn function_call(model: impl Into<String>, name: impl Into<String>, args: JsonValue) -> Self {
        Self {
            content: Content {
                role: Role::Model,
                parts: vec![Part::FunctionCall(FunctionCall {
                    name: name.into(),
                    args,
                })],
            },
            usage: TokenUsage::default(),
            model: model.into(),
            finish_reason: Some("STOP".to_string()),
        }
    }

    /// Concatenated text of the response.
    #[must_use]
    pub fn output_text(&self) -> String {
        self.content.text()
    }

    /// The function call requested by the model, if any.
    #[must_use]
    pub fn requested_call(&self) -> Option<&FunctionCall> {
        self.content.function_call()
    }
}

/// Trait for model transports.
///
/// One instance is created at startup and shared read-only by every stage.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Generates a response for the given request.
    ///
    /// # Errors
    ///
    /// Returns a transport-family [`ModelError`] if the call fails.
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Returns the model name.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_request_builder() {
        let request = ModelRequest::new("Hello, world!")
            .with_system("You are a helpful assistant.")
            .with_output(OutputFormat::Json)
            .with_temperature(0.7)
            .with_max_output_tokens(100);

        assert_eq!(request.last_user_text().as_deref(), Some("Hello, world!"));
        assert_eq!(
            request.system_instruction,
            Some("You are a helpful assistant.".to_string())
        );
        assert_eq!(request.output, OutputFormat::Json);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_output_tokens, Some(100));
    }

    #[test]
    fn content_text_skips_non_text_parts() {
        let content = Content {
            role: Role::Model,
            parts: vec![
                Part::Text("It is ".to_string()),
                Part::FunctionCall(FunctionCall {
                    name: "get_weather".to_string(),
                    args: json!({}),
                }),
                Part::Text("sunny".to_string()),
            ],
        };
        assert_eq!(content.text(), "It is sunny");
        assert_eq!(
            content.function_call().map(|c| c.name.as_str()),
            Some("get_weather")
        );
    }

    #[test]
    fn last_user_text_finds_function_result_turn() {
        let request = ModelRequest::from_contents(vec![
            Content::user("What's the weather?"),
            Content::model("checking"),
            Content::function_response("get_weather", json!({"result": 12})),
        ]);
        // function-response turns have no text parts
        assert_eq!(request.last_user_text().as_deref(), Some(""));
    }

    #[test]
    fn token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn function_call_response_helpers() {
        let response =
            ModelResponse::function_call("test-model", "search_kb", json!({"query": "returns"}));
        assert_eq!(response.output_text(), "");
        let call = response.requested_call().expect("call");
        assert_eq!(call.args["query"], "returns");
    }
}
