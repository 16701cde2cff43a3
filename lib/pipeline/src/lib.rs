//! Gated multi-stage request pipelines for promptline.
//!
//! This crate provides:
//!
//! - **Gate**: strict confidence thresholds and the completed/rejected outcome
//! - **Validator**: independent checks run concurrently and combined by AND
//! - **Router**: classification followed by exactly one category handler
//! - **Chain**: sequential structured steps, each consuming the last record
//!
//! Every stage takes a shared [`promptline_ai::ModelBackend`] and threads
//! parsed records, never raw responses, to the next stage.

pub mod chain;
pub mod gate;
pub mod pipeline;
pub mod request;
pub mod router;
pub mod validator;

pub use chain::Step;
pub use gate::{ConfidenceGate, GateDecision, Outcome, RejectReason};
pub use pipeline::Pipeline;
pub use request::UserRequest;
pub use router::{Classification, RouteHandler, Router};
pub use validator::{
    CheckOutcome, ParallelValidator, SchemaCheck, ValidationCheck, ValidationReport, Verdict,
};
