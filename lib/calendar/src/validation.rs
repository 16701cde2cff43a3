//! Parallel screening of calendar requests.
//!
//! Two independent checks run concurrently: is this a calendar request, and
//! is it safe to act on. The input is valid only if it is calendar-like with
//! confidence above the gate and safe.

use crate::schema::{CalendarValidation, SecurityCheck};
use promptline_ai::{ModelBackend, ModelError};
use promptline_core::Result;
use promptline_pipeline::{
    ConfidenceGate, ParallelValidator, SchemaCheck, UserRequest, ValidationReport, Verdict,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the calendar-likeness check.
pub const CALENDAR_CHECK: &str = "calendar";

/// Name of the security check.
pub const SECURITY_CHECK: &str = "security";

const CALENDAR_INSTRUCTION: &str = "Determine if the request is a valid calendar request.";
const SECURITY_INSTRUCTION: &str = "Check for potential security risks in the request.";

/// Screens raw input before it reaches the calendar pipelines.
#[derive(Debug)]
pub struct RequestValidator {
    validator: ParallelValidator,
}

impl RequestValidator {
    /// Creates a validator using the default confidence gate.
    #[must_use]
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self::with_gate(backend, ConfidenceGate::default())
    }

    /// Creates a validator with a custom confidence gate.
    #[must_use]
    pub fn with_gate(backend: Arc<dyn ModelBackend>, gate: ConfidenceGate) -> Self {
        let calendar = SchemaCheck::new(
            CALENDAR_CHECK,
            CALENDAR_INSTRUCTION,
            move |check: &CalendarValidation| {
                Verdict::from_bool(
                    check.is_calendar_request && gate.passes(check.confidence_score),
                )
            },
        );
        let security = SchemaCheck::new(
            SECURITY_CHECK,
            SECURITY_INSTRUCTION,
            |check: &SecurityCheck| {
                Verdict::from_bool(check.is_safe).with_notes(check.risk_flags.clone())
            },
        );

        Self {
            validator: ParallelValidator::new(backend)
                .with_check(calendar)
                .with_check(security),
        }
    }

    /// Runs both checks and returns the full report.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if either check's model call fails.
    pub async fn report(&self, input: &str) -> Result<ValidationReport, ModelError> {
        info!("validating calendar request");
        let report = self.validator.validate(&UserRequest::new(input)).await?;

        if !report.is_valid() {
            let passed = |name| report.verdict(name).is_some_and(|v| v.passed);
            warn!(
                calendar = passed(CALENDAR_CHECK),
                security = passed(SECURITY_CHECK),
                "validation failed"
            );
            if let Some(flags) = report
                .verdict(SECURITY_CHECK)
                .map(|v| &v.notes)
                .filter(|notes| !notes.is_empty())
            {
                warn!(?flags, "security flags");
            }
        }
        Ok(report)
    }

    /// Whether the input is a safe calendar request.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if either check's model call fails.
    pub async fn validate(&self, input: &str) -> Result<bool, ModelError> {
        Ok(self.report(input).await?.is_valid())
    }
}
