//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause. Every fallible
//! operation in this crate returns `Report<ModelError>`.

use crate::schema::Violation;
use std::fmt;

/// Errors from a model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The request never produced an HTTP response.
    Transport { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// The API answered with a non-success status (auth, quota, bad request).
    Api { status: u16, message: String },
    /// The API answered but returned no usable candidate.
    EmptyResponse { reason: String },
    /// Output did not parse as JSON or did not satisfy the declared schema.
    SchemaViolation {
        schema: String,
        violations: Vec<Violation>,
    },
    /// The request could not be built.
    InvalidRequest { reason: String },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl ModelError {
    /// Returns whether this error belongs to the transport family
    /// (network, timeout, or API-level failure).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout | Self::Api { .. } | Self::EmptyResponse { .. }
        )
    }

    /// Returns whether this error is a schema violation.
    #[must_use]
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::SchemaViolation { .. })
    }

    /// Returns the schema violations carried by this error, if any.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::SchemaViolation { violations, .. } => violations,
            _ => &[],
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { reason } => write!(f, "model request failed: {reason}"),
            Self::Timeout => write!(f, "model request timed out"),
            Self::Api { status, message } => {
                write!(f, "model API returned {status}: {message}")
            }
            Self::EmptyResponse { reason } => {
                write!(f, "model returned no usable output: {reason}")
            }
            Self::SchemaViolation { schema, violations } => {
                write!(f, "output does not match schema '{schema}'")?;
                for (idx, violation) in violations.iter().enumerate() {
                    let sep = if idx == 0 { ": " } else { "; " };
                    write!(f, "{sep}{violation}")?;
                }
                Ok(())
            }
            Self::InvalidRequest { reason } => write!(f, "invalid model request: {reason}"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid model configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for ModelError {}
