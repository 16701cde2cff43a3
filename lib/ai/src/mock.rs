//! A scripted backend for tests and offline demos.
//!
//! `MockBackend` answers every request through a caller-supplied responder
//! and records the requests it received, so tests can assert on what each
//! stage sent without reaching the network.

use crate::backend::{ModelBackend, ModelRequest, ModelResponse};
use crate::error::ModelError;
use async_trait::async_trait;
use promptline_core::Result;
use serde_json::Value as JsonValue;
use std::sync::Mutex;

type Responder =
    Box<dyn Fn(&ModelRequest) -> std::result::Result<ModelResponse, ModelError> + Send + Sync>;

/// Model name reported by [`MockBackend`].
pub const MOCK_MODEL: &str = "mock-model";

/// A backend that answers from a closure.
pub struct MockBackend {
    responder: Responder,
    requests: Mutex<Vec<ModelRequest>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend").finish_non_exhaustive()
    }
}

impl MockBackend {
    /// Creates a backend that answers with `responder`.
    #[must_use]
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&ModelRequest) -> std::result::Result<ModelResponse, ModelError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a backend that always answers with the given text.
    #[must_use]
    pub fn always_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_fn(move |_| Ok(ModelResponse::text(MOCK_MODEL, text.clone())))
    }

    /// Creates a backend that always answers with the given JSON document.
    #[must_use]
    pub fn always_json(value: JsonValue) -> Self {
        Self::always_text(value.to_string())
    }

    /// Creates a backend whose answer depends on the system instruction.
    ///
    /// The first rule whose key is contained in the instruction wins; a
    /// request matching no rule fails with [`ModelError::InvalidRequest`].
    #[must_use]
    pub fn by_instruction<I, K>(rules: I) -> Self
    where
        I: IntoIterator<Item = (K, JsonValue)>,
        K: Into<String>,
    {
        let rules: Vec<(String, JsonValue)> =
            rules.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::from_fn(move |request| {
            let instruction = request.system_instruction.as_deref().unwrap_or_default();
            rules
                .iter()
                .find(|(key, _)| instruction.contains(key.as_str()))
                .map(|(_, value)| ModelResponse::text(MOCK_MODEL, value.to_string()))
                .ok_or_else(|| ModelError::InvalidRequest {
                    reason: format!("no scripted answer for instruction '{instruction}'"),
                })
        })
    }

    /// Creates a backend that always fails with `error`.
    #[must_use]
    pub fn failing(error: ModelError) -> Self {
        Self::from_fn(move |_| Err(error.clone()))
    }

    /// Returns a copy of every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Returns the number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request.clone());
        }
        (self.responder)(request).map_err(Into::into)
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }
}
