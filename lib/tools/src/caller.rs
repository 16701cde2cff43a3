//! The tool-invocation loop.
//!
//! A prompt goes to the model together with the registry's function
//! declarations. If the model asks for a function, it is executed and its
//! result is sent back in a follow-up turn; the model's answer to that turn
//! is the final response. Only one round of tool use is performed.

use crate::error::ToolError;
use crate::tool::ToolRegistry;
use promptline_ai::{Content, ModelBackend, ModelRequest, ModelResponse};
use promptline_core::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::{Instrument, debug, debug_span, info, warn};

/// Default system instruction for the weather and policy assistant.
pub const DEFAULT_INSTRUCTION: &str = "You are a helpful assistant who can answer questions about the weather by invoking the right tools and about policies by looking up a knowledge base";

/// Answers prompts, calling at most one tool along the way.
#[derive(Clone)]
pub struct ToolCaller {
    backend: Arc<dyn ModelBackend>,
    registry: ToolRegistry,
    system_instruction: String,
}

impl std::fmt::Debug for ToolCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCaller")
            .field("model", &self.backend.model())
            .field("registry", &self.registry)
            .field("system_instruction", &self.system_instruction)
            .finish()
    }
}

impl ToolCaller {
    /// Creates a caller using [`DEFAULT_INSTRUCTION`].
    #[must_use]
    pub fn new(backend: Arc<dyn ModelBackend>, registry: ToolRegistry) -> Self {
        Self {
            backend,
            registry,
            system_instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }

    /// Replaces the system instruction.
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// The registered tools.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answers a single user prompt.
    ///
    /// # Errors
    ///
    /// See [`ToolCaller::respond_in`].
    pub async fn respond(&self, prompt: &str) -> Result<String, ToolError> {
        self.respond_in(vec![Content::user(prompt)]).await
    }

    /// Continues `contents` and returns the final text.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if the model names an undeclared
    /// function, the tool's own error if it fails, and
    /// [`ToolError::Model`] if a model call fails.
    pub async fn respond_in(&self, mut contents: Vec<Content>) -> Result<String, ToolError> {
        let span = debug_span!("tool_caller.respond", model = %self.backend.model());
        async move {
            let first = self.generate(&contents).await?;

            let Some(call) = first.requested_call().cloned() else {
                debug!("model answered without calling a tool");
                return Ok(first.output_text());
            };

            info!(function = %call.name, args = %call.args, "model requested a function call");
            let result = self.registry.call(&call.name, &call.args).await?;

            contents.push(first.content);
            contents.push(Content::function_response(
                call.name.clone(),
                json!({ "result": result }),
            ));

            let last = self.generate(&contents).await?;
            if let Some(again) = last.requested_call() {
                warn!(
                    function = %again.name,
                    "model requested a second function call; returning its text"
                );
            }
            Ok(last.output_text())
        }
        .instrument(span)
        .await
    }

    async fn generate(&self, contents: &[Content]) -> Result<ModelResponse, ToolError> {
        let request = ModelRequest::from_contents(contents.to_vec())
            .with_system(self.system_instruction.clone())
            .with_tools(self.registry.declarations());
        self.backend
            .generate(&request)
            .await
            .map_err(|report| {
                let error = ToolError::Model(report.current_context().clone());
                report.context(error)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{self, KnowledgeBaseTool};
    use crate::test_support::serve_json_once;
    use crate::tool::Callable;
    use crate::weather::WeatherTool;
    use promptline_ai::{MockBackend, ModelError, Role};
    use serde_json::json;

    const LONDON_PROMPT: &str = "What is the weather like in London whose latitude is 51.5072 and longitude is -0.1276?";

    fn weather_registry(base_url: String) -> ToolRegistry {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("client");
        ToolRegistry::new()
            .with(Callable::Weather(WeatherTool::with_client(client, base_url)))
            .with(Callable::KnowledgeBase(KnowledgeBaseTool::new(
                knowledge_base::DEFAULT_PATH,
            )))
    }

    /// Asks for the weather first, then answers from the function result.
    fn weather_model() -> MockBackend {
        MockBackend::from_fn(|request| {
            let last = request.contents.last().expect("at least one turn");
            match last.function_response_part() {
                None => Ok(ModelResponse::function_call(
                    "mock-model",
                    "get_weather",
                    json!({"latitude": 51.5072, "longitude": -0.1276}),
                )),
                Some(response) => {
                    let temperature = &response.response["result"]["temperature_2m"];
                    Ok(ModelResponse::text(
                        "mock-model",
                        format!("It is currently {temperature}°C in London."),
                    ))
                }
            }
        })
    }

    #[tokio::test]
    async fn weather_question_runs_one_tool_round() {
        let base_url = serve_json_once(json!({
            "current": {"time": "2025-01-01T12:00", "temperature_2m": 11.3, "wind_speed_10m": 14.0}
        }))
        .await;
        let backend = Arc::new(weather_model());
        let caller = ToolCaller::new(backend.clone(), weather_registry(base_url));

        let answer = caller.respond(LONDON_PROMPT).await.expect("answer");
        assert_eq!(answer, "It is currently 11.3°C in London.");

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some(DEFAULT_INSTRUCTION)
        );
        assert_eq!(requests[0].tools.len(), 2);

        let followup = &requests[1].contents;
        assert_eq!(followup.len(), 3);
        assert_eq!(followup[1].role, Role::Model);
        assert_eq!(
            followup[1].function_call().map(|c| c.name.as_str()),
            Some("get_weather")
        );
        let response = followup[2].function_response_part().expect("function result");
        assert_eq!(followup[2].role, Role::User);
        assert_eq!(response.name, "get_weather");
        assert_eq!(response.response["result"]["wind_speed_10m"], 14.0);
    }

    #[tokio::test]
    async fn direct_answer_skips_tools() {
        let backend = Arc::new(MockBackend::always_text("Hello there."));
        let caller = ToolCaller::new(
            backend.clone(),
            weather_registry("http://127.0.0.1:9".to_string()),
        );

        assert_eq!(caller.respond("Hi").await.expect("answer"), "Hello there.");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn undeclared_function_fails() {
        let backend = Arc::new(MockBackend::from_fn(|_| {
            Ok(ModelResponse::function_call(
                "mock-model",
                "send_email",
                json!({"to": "alice"}),
            ))
        }));
        let caller = ToolCaller::new(
            backend.clone(),
            weather_registry("http://127.0.0.1:9".to_string()),
        );

        let err = caller.respond("Email Alice").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            ToolError::UnknownTool { name } if name == "send_email"
        ));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn model_failure_is_wrapped() {
        let caller = ToolCaller::new(
            Arc::new(MockBackend::failing(ModelError::Timeout)),
            ToolRegistry::new(),
        );

        let err = caller.respond("Hi").await.unwrap_err();
        assert_eq!(
            err.current_context().as_model_error(),
            Some(&ModelError::Timeout)
        );
        // the backend's report survives as the cause
        assert_eq!(err.children().len(), 1);
    }
}
