//! Intent routing.
//!
//! One structured call classifies the input into a category with a
//! confidence score and a cleaned description. If the confidence clears the
//! gate, exactly one handler registered for that category runs on the
//! description. Low confidence and categories without a handler are normal
//! rejections.

use crate::gate::{ConfidenceGate, Outcome, RejectReason};
use crate::pipeline::Pipeline;
use crate::request::UserRequest;
use async_trait::async_trait;
use promptline_ai::{LlmCall, ModelBackend, ModelError, StructuredOutput, Violation};
use promptline_core::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The router's classification record.
pub trait Classification: StructuredOutput {
    /// Name of the field holding the category. An out-of-set value in this
    /// field is an unsupported category rather than a malformed response.
    const CATEGORY_FIELD: &'static str;

    /// The category the input was classified into.
    fn category(&self) -> &str;

    /// The model's confidence in the classification.
    fn confidence(&self) -> f64;

    /// The cleaned description passed to the handler.
    fn description(&self) -> &str;
}

/// Handles one category of request.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    /// What the handler produces.
    type Output: Send;

    /// The category this handler serves.
    fn category(&self) -> &str;

    /// Handles a classified request.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if a model call made by the handler fails.
    async fn handle(
        &self,
        backend: &dyn ModelBackend,
        description: &str,
    ) -> Result<Self::Output, ModelError>;
}

/// Classifies input with `C` and dispatches to a handler producing `O`.
pub struct Router<C, O> {
    backend: Arc<dyn ModelBackend>,
    instruction: String,
    gate: ConfidenceGate,
    handlers: BTreeMap<String, Box<dyn RouteHandler<Output = O>>>,
    _classification: std::marker::PhantomData<fn() -> C>,
}

impl<C, O> std::fmt::Debug for Router<C, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("model", &self.backend.model())
            .field("instruction", &self.instruction)
            .field("gate", &self.gate)
            .field("categories", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C: Classification, O: Send + 'static> Router<C, O> {
    /// Creates a router with the default gate and no handlers.
    #[must_use]
    pub fn new(backend: Arc<dyn ModelBackend>, instruction: impl Into<String>) -> Self {
        Self {
            backend,
            instruction: instruction.into(),
            gate: ConfidenceGate::default(),
            handlers: BTreeMap::new(),
            _classification: std::marker::PhantomData,
        }
    }

    /// Replaces the confidence gate.
    #[must_use]
    pub fn with_gate(mut self, gate: ConfidenceGate) -> Self {
        self.gate = gate;
        self
    }

    /// Registers a handler for its category.
    #[must_use]
    pub fn with_handler(mut self, handler: impl RouteHandler<Output = O> + 'static) -> Self {
        self.handlers
            .insert(handler.category().to_string(), Box::new(handler));
        self
    }

    /// Categories with a registered handler.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Classifies the request.
    ///
    /// Returns `Ok(None)` if the model answered with a category outside the
    /// declared set.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] for transport failures and any other schema
    /// violation.
    pub async fn classify(&self, request: &UserRequest) -> Result<Option<C>, ModelError> {
        let call = LlmCall::new(request.as_str()).with_instruction(self.instruction.clone());
        match call.run::<C>(self.backend.as_ref()).await {
            Ok(classification) => Ok(Some(classification)),
            Err(report) if is_unknown_category(report.current_context(), C::CATEGORY_FIELD) => {
                warn!(error = %report, "model answered with an unknown category");
                Ok(None)
            }
            Err(report) => Err(report),
        }
    }

    /// Classifies the request and runs the matching handler.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if classification or the handler fails.
    #[instrument(skip_all)]
    pub async fn route(&self, request: &UserRequest) -> Result<Outcome<O>, ModelError> {
        info!("routing request");
        let Some(classification) = self.classify(request).await? else {
            return Ok(Outcome::Rejected(RejectReason::UnsupportedCategory));
        };

        let category = classification.category();
        let confidence = classification.confidence();
        info!(category, confidence, "classification complete");

        if !self.gate.passes(confidence) {
            warn!(confidence, threshold = self.gate.threshold(), "low confidence score");
            return Ok(Outcome::Rejected(RejectReason::LowConfidence));
        }

        let Some(handler) = self.handlers.get(category) else {
            warn!(category, "request type not supported");
            return Ok(Outcome::Rejected(RejectReason::UnsupportedCategory));
        };

        let output = handler
            .handle(self.backend.as_ref(), classification.description())
            .await?;
        Ok(Outcome::Completed(output))
    }
}

#[async_trait]
impl<C: Classification + 'static, O: Send + 'static> Pipeline for Router<C, O> {
    type Output = O;

    async fn run(&self, request: &UserRequest) -> Result<Outcome<O>, ModelError> {
        self.route(request).await
    }
}

/// Whether every violation is an out-of-set value in `field`.
fn is_unknown_category(error: &ModelError, field: &str) -> bool {
    let violations = error.violations();
    !violations.is_empty()
        && violations
            .iter()
            .all(|v| matches!(v, Violation::NotInEnum { path, .. } if path == field))
}
