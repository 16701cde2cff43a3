//! LLM Call primitive.
//!
//! The fundamental AI operation: single-shot inference with an instruction,
//! user content and an optional declared output schema. Every stage of a
//! pipeline is built from this primitive.

use crate::backend::{ModelBackend, ModelRequest, OutputFormat, TokenUsage};
use crate::error::ModelError;
use crate::schema::{SchemaDescriptor, StructuredOutput, Violation};
use chrono::{DateTime, Utc};
use promptline_core::{InvocationId, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Instant;
use tracing::{Instrument, debug, debug_span, warn};

/// The result of an LLM Call.
#[derive(Debug, Clone)]
pub struct LlmCallResult {
    /// Unique identifier for this invocation.
    pub id: InvocationId,
    /// The raw text output.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// An LLM Call builder.
#[derive(Debug, Clone, Default)]
pub struct LlmCall {
    instruction: Option<String>,
    content: String,
    output: OutputFormat,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl LlmCall {
    /// Creates a new LLM Call with the given user content.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Creates an LLM Call whose content is a prior stage's structured
    /// result, serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidRequest`] if the value cannot be serialized.
    pub fn from_structured<T: Serialize>(value: &T) -> Result<Self, ModelError> {
        let content = serde_json::to_string(value).map_err(|e| ModelError::InvalidRequest {
            reason: format!("cannot serialize prior stage output: {e}"),
        })?;
        Ok(Self::new(content))
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Requests output conforming to `schema`.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaDescriptor) -> Self {
        self.output = OutputFormat::Schema(schema);
        self
    }

    /// Requests a JSON document without a declared schema.
    #[must_use]
    pub fn json_mode(mut self) -> Self {
        self.output = OutputFormat::Json;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max output tokens.
    #[must_use]
    pub fn with_max_output_tokens(mut self, max_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_tokens);
        self
    }

    /// The user content this call sends.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Builds a model request from this configuration.
    #[must_use]
    pub fn build_request(&self) -> ModelRequest {
        let mut request = ModelRequest::new(self.content.clone()).with_output(self.output.clone());

        if let Some(ref instruction) = self.instruction {
            request = request.with_system(instruction.clone());
        }

        if let Some(temp) = self.temperature {
            request = request.with_temperature(temp);
        }

        if let Some(max_tokens) = self.max_output_tokens {
            request = request.with_max_output_tokens(max_tokens);
        }

        request
    }

    fn schema_name(&self) -> &str {
        match &self.output {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Schema(schema) => &schema.name,
        }
    }

    /// Sends the call and returns the raw text output.
    ///
    /// # Errors
    ///
    /// Returns a transport-family [`ModelError`] if the backend fails.
    pub async fn invoke(&self, backend: &dyn ModelBackend) -> Result<LlmCallResult, ModelError> {
        let id = InvocationId::new();
        let request = self.build_request();
        let span = debug_span!(
            "llm_call",
            invocation = %id,
            model = backend.model(),
            output = self.schema_name()
        );

        let started = Instant::now();
        let response = match backend.generate(&request).instrument(span).await {
            Ok(response) => response,
            Err(report) => {
                warn!(invocation = %id, error = %report, "model call failed");
                return Err(report);
            }
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(
            invocation = %id,
            latency_ms,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "model call complete"
        );

        Ok(LlmCallResult {
            id,
            content: response.output_text(),
            usage: response.usage,
            model: response.model,
            timestamp: Utc::now(),
            latency_ms,
        })
    }

    /// Sends the call and returns the text output.
    ///
    /// # Errors
    ///
    /// Returns a transport-family [`ModelError`] if the backend fails.
    pub async fn text(&self, backend: &dyn ModelBackend) -> Result<String, ModelError> {
        Ok(self.invoke(backend).await?.content)
    }

    /// Sends the call and parses the output as JSON, validating it against
    /// the declared schema when there is one.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SchemaViolation`] if the output does not parse or
    /// does not conform, or a transport-family error if the backend fails.
    pub async fn json(&self, backend: &dyn ModelBackend) -> Result<JsonValue, ModelError> {
        let result = self.invoke(backend).await?;
        match &self.output {
            OutputFormat::Schema(schema) => parse_structured(schema, &result.content),
            OutputFormat::Json | OutputFormat::Text => {
                parse_json(&result.content).map_err(|violation| {
                    ModelError::SchemaViolation {
                        schema: "json".to_string(),
                        violations: vec![violation],
                    }
                    .into()
                })
            }
        }
    }

    /// Sends the call with `T`'s schema and decodes the output into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SchemaViolation`] if the output does not conform
    /// to `T`'s schema, or a transport-family error if the backend fails.
    pub async fn run<T: StructuredOutput>(self, backend: &dyn ModelBackend) -> Result<T, ModelError> {
        let schema = T::schema();
        let name = schema.name.clone();
        let value = self.with_schema(schema).json(backend).await?;
        serde_json::from_value(value).map_err(|e| {
            ModelError::SchemaViolation {
                schema: name,
                violations: vec![Violation::Decode {
                    reason: e.to_string(),
                }],
            }
            .into()
        })
    }
}

/// Strips a surrounding Markdown code fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // drop the info string ("json") on the opening line
    match rest.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => {
            let line = rest.trim();
            let info_len = line
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(line.len());
            if info_len > 0 && line[info_len..].starts_with(char::is_whitespace) {
                line[info_len..].trim()
            } else {
                line
            }
        }
    }
}

/// Parses raw model output as JSON.
///
/// # Errors
///
/// Returns [`Violation::NotJson`] if the output is not a JSON document.
pub fn parse_json(raw: &str) -> std::result::Result<JsonValue, Violation> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| Violation::NotJson {
        reason: e.to_string(),
    })
}

/// Parses raw model output and validates it against `schema`.
///
/// # Errors
///
/// Returns [`ModelError::SchemaViolation`] listing every violation found.
pub fn parse_structured(schema: &SchemaDescriptor, raw: &str) -> Result<JsonValue, ModelError> {
    let value = parse_json(raw).map_err(|violation| ModelError::SchemaViolation {
        schema: schema.name.clone(),
        violations: vec![violation],
    })?;
    schema
        .validate(&value)
        .map_err(|violations| ModelError::SchemaViolation {
            schema: schema.name.clone(),
            violations,
        })?;
    Ok(value)
}
