//! Core types shared by every promptline crate.
//!
//! This crate provides the `Result` alias used for error propagation and the
//! identifiers that tie log lines to a single pipeline run or model call.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{InvocationId, ParseIdError, PipelineRunId};
