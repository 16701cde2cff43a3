//! Three-step prompt chain turning free text into an event confirmation.
//!
//! 1. Extraction decides whether the text describes an event at all; the
//!    run stops there unless it does with confidence above the gate.
//! 2. Parsing turns the extracted description into event details.
//! 3. Confirmation writes the message shown to the user from those details.

use crate::schema::{EventConfirmation, EventDetails, EventExtraction};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use promptline_ai::{ModelBackend, ModelError};
use promptline_core::Result;
use promptline_pipeline::{ConfidenceGate, GateDecision, Outcome, Pipeline, Step, UserRequest};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Name the confirmation message is signed with by default.
pub const DEFAULT_SIGNATURE: &str = "Susie";

/// The "Today is ..." sentence giving the model a reference date.
#[must_use]
pub fn date_context(today: NaiveDate) -> String {
    format!("Today is {}.", today.format("%A, %B %d, %Y"))
}

/// Processes calendar requests through extraction, parsing and confirmation.
pub struct CalendarChain {
    backend: Arc<dyn ModelBackend>,
    gate: ConfidenceGate,
    today: Option<NaiveDate>,
    signature: String,
}

impl std::fmt::Debug for CalendarChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarChain")
            .field("model", &self.backend.model())
            .field("gate", &self.gate)
            .field("today", &self.today)
            .field("signature", &self.signature)
            .finish()
    }
}

impl CalendarChain {
    /// Creates a chain that dates requests with the local clock.
    #[must_use]
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            gate: ConfidenceGate::default(),
            today: None,
            signature: DEFAULT_SIGNATURE.to_string(),
        }
    }

    /// Pins the reference date instead of reading the clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Replaces the name the confirmation is signed with.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Replaces the confidence gate.
    #[must_use]
    pub fn with_gate(mut self, gate: ConfidenceGate) -> Self {
        self.gate = gate;
        self
    }

    fn date_context(&self) -> String {
        date_context(self.today.unwrap_or_else(|| Local::now().date_naive()))
    }

    /// Decides whether the input describes a calendar event.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the model call fails or its output does
    /// not match [`EventExtraction`].
    #[instrument(skip_all)]
    pub async fn extract(&self, input: &str) -> Result<EventExtraction, ModelError> {
        info!("starting event extraction analysis");
        debug!(input, "input text");
        let step = Step::<EventExtraction>::new(
            "extract",
            format!(
                "{} Analyze if the text describes a calendar event.",
                self.date_context()
            ),
        );
        let extraction = step.run(self.backend.as_ref(), input).await?;
        info!(
            is_calendar_event = extraction.is_calendar_event,
            confidence = extraction.confidence_score,
            "extraction complete"
        );
        Ok(extraction)
    }

    /// Parses an event description into event details.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the model call fails or its output does
    /// not match [`EventDetails`].
    #[instrument(skip_all)]
    pub async fn parse_details(&self, description: &str) -> Result<EventDetails, ModelError> {
        info!("starting event details parsing");
        let step = Step::<EventDetails>::new(
            "parse_details",
            format!(
                "{} Parse the following event description into a structured event object.",
                self.date_context()
            ),
        );
        let details = step.run(self.backend.as_ref(), description).await?;
        info!(
            name = %details.name,
            date = %details.date,
            duration_minutes = details.duration_minutes,
            "parsed event details"
        );
        debug!(participants = %details.participants.join(", "), "participants");
        Ok(details)
    }

    /// Writes a confirmation message for the event.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the model call fails or its output does
    /// not match [`EventConfirmation`].
    #[instrument(skip_all)]
    pub async fn confirm(&self, details: &EventDetails) -> Result<EventConfirmation, ModelError> {
        info!("generating confirmation message");
        let step = Step::<EventConfirmation>::new(
            "confirm",
            format!(
                "Generate a natural confirmation message for the event. Sign off with your name; {}",
                self.signature
            ),
        );
        let confirmation = step.run_after(self.backend.as_ref(), details).await?;
        info!(message = %confirmation.confirmation_message, "confirmation message generated");
        Ok(confirmation)
    }
}

#[async_trait]
impl Pipeline for CalendarChain {
    type Output = EventConfirmation;

    async fn run(&self, request: &UserRequest) -> Result<Outcome<EventConfirmation>, ModelError> {
        info!("processing calendar request");
        let extraction = self.extract(request.as_str()).await?;

        if let GateDecision::Reject(reason) = self
            .gate
            .check(extraction.is_calendar_event, extraction.confidence_score)
        {
            warn!(
                is_calendar_event = extraction.is_calendar_event,
                confidence = extraction.confidence_score,
                %reason,
                "gate check failed"
            );
            return Ok(Outcome::Rejected(reason));
        }
        info!("gate check passed, proceeding with event processing");

        let details = self.parse_details(&extraction.description).await?;
        let confirmation = self.confirm(&details).await?;

        info!("calendar request processing completed successfully");
        Ok(Outcome::Completed(confirmation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptline_ai::{MockBackend, ModelResponse};
    use promptline_pipeline::RejectReason;
    use serde_json::{Value as JsonValue, json};

    const DENTIST: &str = "Dentist's appointment next Friday from 8:30 AM to 10:00 AM PT. Leave at least 30 minutes before the appointment.";

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date")
    }

    fn details() -> JsonValue {
        json!({
            "name": "Dentist's appointment",
            "date": "2025-03-14T08:30:00-07:00",
            "duration_minutes": 90,
            "participants": []
        })
    }

    fn scripted(extraction: JsonValue) -> Arc<MockBackend> {
        Arc::new(MockBackend::by_instruction([
            ("Analyze if the text", extraction),
            ("Parse the following", details()),
            (
                "confirmation message",
                json!({
                    "confirmation_message": "Your dentist appointment is booked. Susie",
                    "calendar_link": null
                }),
            ),
        ]))
    }

    #[test]
    fn date_context_uses_long_form() {
        assert_eq!(date_context(friday()), "Today is Friday, March 07, 2025.");
    }

    #[tokio::test]
    async fn event_runs_all_three_steps() {
        let backend = scripted(json!({
            "description": "Dentist appointment next Friday 8:30-10:00 AM PT",
            "is_calendar_event": true,
            "confidence_score": 0.9
        }));
        let chain = CalendarChain::new(backend.clone()).with_today(friday());

        let confirmation = chain
            .process(DENTIST)
            .await
            .expect("process")
            .expect("confirmation");
        assert_eq!(
            confirmation.confirmation_message,
            "Your dentist appointment is booked. Susie"
        );
        assert_eq!(confirmation.calendar_link, None);

        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some("Today is Friday, March 07, 2025. Analyze if the text describes a calendar event.")
        );
        assert_eq!(requests[0].last_user_text().as_deref(), Some(DENTIST));
        assert_eq!(
            requests[1].last_user_text().as_deref(),
            Some("Dentist appointment next Friday 8:30-10:00 AM PT")
        );
        assert!(
            requests[2]
                .system_instruction
                .as_deref()
                .is_some_and(|s| s.ends_with("Sign off with your name; Susie"))
        );

        // the confirmation step receives the parsed details, not the raw reply
        let handed_over: EventDetails =
            serde_json::from_str(&requests[2].last_user_text().expect("content"))
                .expect("details");
        assert_eq!(handed_over.duration_minutes, 90);
    }

    #[tokio::test]
    async fn non_event_stops_after_extraction() {
        let backend = scripted(json!({
            "description": "Send an email to Alice and Bob",
            "is_calendar_event": false,
            "confidence_score": 0.95
        }));
        let chain = CalendarChain::new(backend.clone()).with_today(friday());

        let outcome = chain
            .run(&UserRequest::new(
                "Can you send an email to Alice and Bob to discuss the project roadmap?",
            ))
            .await
            .expect("run");
        assert_eq!(outcome, Outcome::Rejected(RejectReason::NotApplicable));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn gate_boundary_is_exclusive() {
        for (confidence, passes) in [(0.7, false), (0.700_000_01, true)] {
            let backend = scripted(json!({
                "description": "Dentist",
                "is_calendar_event": true,
                "confidence_score": confidence
            }));
            let result = CalendarChain::new(backend)
                .with_today(friday())
                .process(DENTIST)
                .await
                .expect("process");
            assert_eq!(result.is_some(), passes, "confidence {confidence}");
        }
    }

    #[tokio::test]
    async fn custom_signature_reaches_the_model() {
        let backend = scripted(json!({
            "description": "Dentist",
            "is_calendar_event": true,
            "confidence_score": 0.9
        }));
        CalendarChain::new(backend.clone())
            .with_today(friday())
            .with_signature("Max")
            .process(DENTIST)
            .await
            .expect("process");
        let last = backend.requests().pop().expect("request");
        assert!(
            last.system_instruction
                .as_deref()
                .is_some_and(|s| s.ends_with("your name; Max"))
        );
    }

    #[tokio::test]
    async fn failing_step_aborts_the_chain() {
        let backend = Arc::new(MockBackend::from_fn(|request| {
            let instruction = request.system_instruction.as_deref().unwrap_or_default();
            if instruction.contains("Analyze") {
                Ok(ModelResponse::text(
                    "mock-model",
                    json!({"description": "x", "is_calendar_event": true, "confidence_score": 0.9})
                        .to_string(),
                ))
            } else {
                Err(ModelError::Timeout)
            }
        }));
        let err = CalendarChain::new(backend.clone())
            .with_today(friday())
            .process(DENTIST)
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &ModelError::Timeout);
        assert_eq!(backend.call_count(), 2);
    }
}
