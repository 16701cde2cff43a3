//! The caller-facing pipeline entry point.

use crate::gate::Outcome;
use crate::request::UserRequest;
use async_trait::async_trait;
use promptline_ai::ModelError;
use promptline_core::{PipelineRunId, Result};
use tracing::{Instrument, info, info_span};

/// A gated, multi-stage request pipeline.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// The final response.
    type Output: Send;

    /// Runs every stage on the request.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if any model call fails. Gate rejections are
    /// not errors.
    async fn run(&self, request: &UserRequest) -> Result<Outcome<Self::Output>, ModelError>;

    /// Runs the pipeline on raw input, reporting a gate rejection as `None`.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::run`].
    async fn process(&self, input: &str) -> Result<Option<Self::Output>, ModelError> {
        let run_id = PipelineRunId::new();
        let request = UserRequest::new(input);
        let span = info_span!("pipeline", run = %run_id);

        let outcome = self.run(&request).instrument(span.clone()).await?;
        span.in_scope(|| match outcome.reject_reason() {
            Some(reason) => info!(%reason, "run rejected"),
            None => info!("run completed"),
        });
        Ok(outcome.into_option())
    }
}
