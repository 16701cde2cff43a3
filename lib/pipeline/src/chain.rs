//! Sequential handler chains.
//!
//! A [`Step`] is one structured model call with a fixed instruction. Chains
//! are written as plain sequential code over steps: each step consumes the
//! previous step's parsed record, serialized back to JSON text, so no stage
//! ever sees a raw response envelope.

use promptline_ai::{LlmCall, ModelBackend, ModelError, StructuredOutput};
use promptline_core::Result;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{Instrument, debug, debug_span};

/// One schema-constrained model call in a chain.
#[derive(Debug, Clone)]
pub struct Step<T> {
    name: String,
    instruction: String,
    _output: PhantomData<fn() -> T>,
}

impl<T> Step<T> {
    /// Creates a step with the given name and system instruction.
    #[must_use]
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            _output: PhantomData,
        }
    }

    /// The step's name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The system instruction sent with every call.
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// The call this step would make for `input`.
    #[must_use]
    pub fn call(&self, input: impl Into<String>) -> LlmCall {
        LlmCall::new(input).with_instruction(self.instruction.clone())
    }
}

impl<T: StructuredOutput> Step<T> {
    /// Runs the step on free text.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SchemaViolation`] if the output does not match
    /// `T`, or a transport-family error if the call fails.
    pub async fn run(&self, backend: &dyn ModelBackend, input: &str) -> Result<T, ModelError> {
        self.execute(backend, self.call(input)).await
    }

    /// Runs the step on the previous step's record.
    ///
    /// # Errors
    ///
    /// Same as [`Step::run`], plus [`ModelError::InvalidRequest`] if `prior`
    /// cannot be serialized.
    pub async fn run_after<P: Serialize + Sync>(
        &self,
        backend: &dyn ModelBackend,
        prior: &P,
    ) -> Result<T, ModelError> {
        let call = LlmCall::from_structured(prior)?.with_instruction(self.instruction.clone());
        self.execute(backend, call).await
    }

    async fn execute(&self, backend: &dyn ModelBackend, call: LlmCall) -> Result<T, ModelError> {
        let span = debug_span!("step", name = %self.name);
        async move {
            let output = call.run::<T>(backend).await?;
            debug!("step complete");
            Ok(output)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptline_ai::{Field, MockBackend, ModelResponse, SchemaDescriptor};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Meeting {
        name: String,
        duration_minutes: i64,
        participants: Vec<String>,
    }

    impl StructuredOutput for Meeting {
        fn schema() -> SchemaDescriptor {
            SchemaDescriptor::new("Meeting", "A meeting")
                .field(Field::string("name", "Name"))
                .field(Field::integer("duration_minutes", "Duration"))
                .field(Field::string_list("participants", "Participants"))
        }
    }

    #[tokio::test]
    async fn handoff_round_trips_through_text() {
        let meeting = Meeting {
            name: "Roadmap review".to_string(),
            duration_minutes: 45,
            participants: vec!["Alice".to_string(), "Bob".to_string()],
        };
        // echoes the user turn back as the model's answer
        let backend = MockBackend::from_fn(|request| {
            let text = request.last_user_text().unwrap_or_default();
            Ok(ModelResponse::text("mock-model", text))
        });

        let step: Step<Meeting> = Step::new("echo", "Repeat the event.");
        let echoed = step.run_after(&backend, &meeting).await.expect("step");
        assert_eq!(echoed, meeting);

        let sent = backend.requests();
        assert_eq!(sent[0].system_instruction.as_deref(), Some("Repeat the event."));
    }

    #[tokio::test]
    async fn run_rejects_nonconforming_output() {
        let backend = MockBackend::always_json(json!({"name": "Standup"}));
        let step: Step<Meeting> = Step::new("parse", "Parse the event.");

        let err = step.run(&backend, "standup at 9").await.unwrap_err();
        assert!(err.current_context().is_schema_violation());
    }

    #[test]
    fn accessors() {
        let step: Step<Meeting> = Step::new("parse", "Parse the event.");
        assert_eq!(step.name(), "parse");
        assert_eq!(step.instruction(), "Parse the event.");
        assert_eq!(step.call("hello").content(), "hello");
    }
}
