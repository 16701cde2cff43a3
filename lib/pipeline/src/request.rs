//! Raw user input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The text a user submitted. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRequest(String);

impl UserRequest {
    /// Wraps the given input.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self(input.into())
    }

    /// The input text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserRequest {
    fn from(input: &str) -> Self {
        Self::new(input)
    }
}

impl From<String> for UserRequest {
    fn from(input: String) -> Self {
        Self(input)
    }
}
