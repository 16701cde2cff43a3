//! Routing calendar requests to new-event and modify-event handlers.

use crate::schema::{
    CalendarRequestType, CalendarResponse, ModifyEventDetails, NewEventDetails, RequestType,
};
use async_trait::async_trait;
use promptline_ai::{ModelBackend, ModelError};
use promptline_core::Result;
use promptline_pipeline::{RouteHandler, Router, Step};
use std::sync::Arc;
use tracing::info;

const ROUTER_INSTRUCTION: &str =
    "Determine if the request is to create a new calendar event or modify an existing one.";

/// Router over [`CalendarRequestType`] producing a [`CalendarResponse`].
pub type CalendarRouter = Router<CalendarRequestType, CalendarResponse>;

/// Builds the calendar router with both handlers registered.
#[must_use]
pub fn calendar_router(backend: Arc<dyn ModelBackend>) -> CalendarRouter {
    Router::new(backend, ROUTER_INSTRUCTION)
        .with_handler(NewEventHandler)
        .with_handler(ModifyEventHandler)
}

/// Creates new events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewEventHandler;

#[async_trait]
impl RouteHandler for NewEventHandler {
    type Output = CalendarResponse;

    fn category(&self) -> &str {
        RequestType::NewEvent.as_str()
    }

    async fn handle(
        &self,
        backend: &dyn ModelBackend,
        description: &str,
    ) -> Result<CalendarResponse, ModelError> {
        info!("processing new event request");
        let details = Step::<NewEventDetails>::new(
            "new_event",
            "Extract details for creating a new calendar event.",
        )
        .run(backend, description)
        .await?;
        info!(?details, "new calendar event");

        Ok(CalendarResponse {
            success: true,
            message: format!(
                "New calendar event '{}' created for {} with {}",
                details.name,
                details.date,
                details.participants.join(", ")
            ),
            calendar_link: Some(format!("calendar://new?event={}", details.name)),
        })
    }
}

/// Modifies existing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifyEventHandler;

#[async_trait]
impl RouteHandler for ModifyEventHandler {
    type Output = CalendarResponse;

    fn category(&self) -> &str {
        RequestType::ModifyEvent.as_str()
    }

    async fn handle(
        &self,
        backend: &dyn ModelBackend,
        description: &str,
    ) -> Result<CalendarResponse, ModelError> {
        info!("processing modify event request");
        let details = Step::<ModifyEventDetails>::new(
            "modify_event",
            "Extract details for modifying an existing calendar event.",
        )
        .run(backend, description)
        .await?;
        info!(?details, "modify calendar event");

        Ok(CalendarResponse {
            success: true,
            message: format!("Modified calendar event '{}'", details.event_identifier),
            calendar_link: Some(format!(
                "calendar://modify?event={}",
                details.event_identifier
            )),
        })
    }
}
