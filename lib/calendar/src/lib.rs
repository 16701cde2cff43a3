//! Calendar request pipelines for promptline.
//!
//! This crate provides:
//!
//! - **Schemas**: the records exchanged with the model
//! - **Validation**: concurrent calendar-likeness and security screening
//! - **Chain**: extraction, details and confirmation for a single event
//! - **Routing**: new-event and modify-event handlers behind a classifier

pub mod chain;
pub mod routing;
pub mod schema;
pub mod validation;

pub use chain::{CalendarChain, DEFAULT_SIGNATURE, date_context};
pub use routing::{CalendarRouter, ModifyEventHandler, NewEventHandler, calendar_router};
pub use schema::{
    CalendarRequestType, CalendarResponse, CalendarValidation, Change, EventConfirmation,
    EventDetails, EventExtraction, ModifyEventDetails, NewEventDetails, RequestType,
    SecurityCheck,
};
pub use validation::RequestValidator;
