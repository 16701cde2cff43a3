//! Tool registry for function calling.
//!
//! The model picks a function by name. Names are resolved against a fixed
//! registry of known callables; anything else is rejected with
//! [`ToolError::UnknownTool`].

use crate::error::ToolError;
use crate::knowledge_base::{self, KnowledgeBaseTool};
use crate::weather::{self, WeatherTool};
use promptline_ai::{FunctionDeclaration, SchemaDescriptor};
use promptline_core::Result;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Definition of a tool as declared to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared parameters.
    pub parameters: SchemaDescriptor,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: SchemaDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Converts the definition to the format expected by the model API.
    #[must_use]
    pub fn to_declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.to_json_schema(),
        }
    }
}

/// The known callables.
#[derive(Debug, Clone)]
pub enum Callable {
    Weather(WeatherTool),
    KnowledgeBase(KnowledgeBaseTool),
}

impl Callable {
    /// Returns the tool definition.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        match self {
            Self::Weather(_) => ToolDefinition::new(
                weather::NAME,
                "Get current temperature for provided coordinates in celsius.",
                WeatherTool::parameters(),
            ),
            Self::KnowledgeBase(_) => ToolDefinition::new(
                knowledge_base::NAME,
                "Search the knowledge base for information about the given query.",
                KnowledgeBaseTool::parameters(),
            ),
        }
    }

    /// Executes the callable with the model-supplied arguments.
    ///
    /// Arguments are checked against the declared parameters first.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] on a schema mismatch, or
    /// whatever the callable itself fails with.
    pub async fn invoke(&self, args: &JsonValue) -> Result<JsonValue, ToolError> {
        let definition = self.definition();
        if let Err(violations) = definition.parameters.validate(args) {
            let reason = violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ToolError::InvalidArguments {
                name: definition.name,
                reason,
            }
            .into());
        }

        match self {
            Self::Weather(tool) => tool.call(args).await,
            Self::KnowledgeBase(tool) => tool.call(args).await,
        }
    }
}

/// Registry of available tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Callable>,
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registers a callable under its declared name.
    pub fn register(&mut self, callable: Callable) {
        self.tools.insert(callable.definition().name, callable);
    }

    /// Registers a callable, builder style.
    #[must_use]
    pub fn with(mut self, callable: Callable) -> Self {
        self.register(callable);
        self
    }

    /// Gets a callable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Callable> {
        self.tools.get(name)
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function declarations for every registered tool, sorted by name.
    #[must_use]
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools
            .values()
            .map(|callable| callable.definition().to_declaration())
            .collect()
    }

    /// Invokes the tool called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if no such tool is registered, or
    /// the tool's own error.
    pub async fn call(&self, name: &str, args: &JsonValue) -> Result<JsonValue, ToolError> {
        let callable = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;
        callable.invoke(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Callable::Weather(WeatherTool::new(weather::DEFAULT_BASE_URL)))
            .with(Callable::KnowledgeBase(KnowledgeBaseTool::new(
                knowledge_base::DEFAULT_PATH,
            )))
    }

    #[test]
    fn registry_operations() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert!(registry.get("get_weather").is_some());
        assert!(registry.get("search_kb").is_some());
        assert!(registry.get("send_email").is_none());
    }

    #[test]
    fn declarations_carry_parameter_schemas() {
        let declarations = registry().declarations();
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].name, "get_weather");
        assert_eq!(
            declarations[0].parameters["required"],
            json!(["latitude", "longitude"])
        );
        assert_eq!(declarations[1].name, "search_kb");
        assert_eq!(
            declarations[1].parameters["properties"]["query"]["type"],
            "string"
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = registry()
            .call("send_email", &json!({"to": "alice"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.current_context(),
            &ToolError::UnknownTool {
                name: "send_email".to_string()
            }
        );
    }

    #[tokio::test]
    async fn arguments_are_checked_before_invocation() {
        let err = registry()
            .call("get_weather", &json!({"latitude": "north", "longitude": 0.0}))
            .await
            .unwrap_err();
        match err.current_context() {
            ToolError::InvalidArguments { name, reason } => {
                assert_eq!(name, "get_weather");
                assert!(reason.contains("latitude"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
