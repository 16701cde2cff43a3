//! Parallel independent validation checks.
//!
//! Every check is a separate model call against the same input. All checks
//! are issued at once and the validator waits for every one of them; the
//! input is valid only if all checks pass. A failing call fails the whole
//! validation.

use crate::chain::Step;
use crate::request::UserRequest;
use async_trait::async_trait;
use futures::future::try_join_all;
use promptline_ai::{ModelBackend, ModelError, StructuredOutput};
use promptline_core::Result;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span, warn};

/// A check's judgement of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the check passed.
    pub passed: bool,
    /// Free-form findings reported alongside the verdict.
    pub notes: Vec<String>,
}

impl Verdict {
    /// A passing verdict with no notes.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            passed: true,
            notes: Vec::new(),
        }
    }

    /// A verdict from a boolean.
    #[must_use]
    pub fn from_bool(passed: bool) -> Self {
        Self {
            passed,
            notes: Vec::new(),
        }
    }

    /// Attaches notes.
    #[must_use]
    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// One independent validation.
#[async_trait]
pub trait ValidationCheck: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Judges the request.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the underlying model call fails.
    async fn check(
        &self,
        backend: &dyn ModelBackend,
        request: &UserRequest,
    ) -> Result<Verdict, ModelError>;
}

type Judge<T> = Box<dyn Fn(&T) -> Verdict + Send + Sync>;

/// A check answered by one structured model call and judged from its
/// parsed record.
pub struct SchemaCheck<T> {
    step: Step<T>,
    judge: Judge<T>,
}

impl<T> std::fmt::Debug for SchemaCheck<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCheck")
            .field("name", &self.step.name())
            .finish_non_exhaustive()
    }
}

impl<T: StructuredOutput> SchemaCheck<T> {
    /// Creates a check sending `instruction` and judging the result with
    /// `judge`.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, instruction: impl Into<String>, judge: F) -> Self
    where
        F: Fn(&T) -> Verdict + Send + Sync + 'static,
    {
        Self {
            step: Step::new(name, instruction),
            judge: Box::new(judge),
        }
    }
}

#[async_trait]
impl<T: StructuredOutput + 'static> ValidationCheck for SchemaCheck<T> {
    fn name(&self) -> &str {
        self.step.name()
    }

    async fn check(
        &self,
        backend: &dyn ModelBackend,
        request: &UserRequest,
    ) -> Result<Verdict, ModelError> {
        let record = self.step.run(backend, request.as_str()).await?;
        Ok((self.judge)(&record))
    }
}

/// A named verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The check's name.
    pub name: String,
    /// Its verdict.
    pub verdict: Verdict,
}

/// Combined result of every check, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    outcomes: Vec<CheckOutcome>,
}

impl ValidationReport {
    /// Whether every check passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.outcomes.iter().all(|o| o.verdict.passed)
    }

    /// Every check's outcome.
    #[must_use]
    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    /// The verdict of the check called `name`.
    #[must_use]
    pub fn verdict(&self, name: &str) -> Option<&Verdict> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| &o.verdict)
    }

    /// Outcomes of the checks that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.verdict.passed)
    }
}

/// Runs a set of checks concurrently and ANDs their verdicts.
pub struct ParallelValidator {
    backend: Arc<dyn ModelBackend>,
    checks: Vec<Box<dyn ValidationCheck>>,
}

impl std::fmt::Debug for ParallelValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.checks.iter().map(|c| c.name()).collect();
        f.debug_struct("ParallelValidator")
            .field("model", &self.backend.model())
            .field("checks", &names)
            .finish()
    }
}

impl ParallelValidator {
    /// Creates a validator with no checks.
    #[must_use]
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            checks: Vec::new(),
        }
    }

    /// Adds a check.
    #[must_use]
    pub fn with_check(mut self, check: impl ValidationCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether no checks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Runs every check against `request` and combines the verdicts.
    ///
    /// With no checks registered the request is trivially valid.
    ///
    /// # Errors
    ///
    /// Returns the first [`ModelError`] raised by any check.
    pub async fn validate(&self, request: &UserRequest) -> Result<ValidationReport, ModelError> {
        let span = info_span!("validate", checks = self.checks.len());
        let backend = self.backend.as_ref();

        let outcomes = try_join_all(
            self.checks
                .iter()
                .map(|check| run_check(check.as_ref(), backend, request)),
        )
        .instrument(span)
        .await?;

        let report = ValidationReport { outcomes };
        for failed in report.failures() {
            warn!(check = %failed.name, notes = ?failed.verdict.notes, "check failed");
        }
        Ok(report)
    }
}

async fn run_check(
    check: &dyn ValidationCheck,
    backend: &dyn ModelBackend,
    request: &UserRequest,
) -> Result<CheckOutcome, ModelError> {
    let verdict = check.check(backend, request).await?;
    debug!(check = check.name(), passed = verdict.passed, "check complete");
    Ok(CheckOutcome {
        name: check.name().to_string(),
        verdict,
    })
}
