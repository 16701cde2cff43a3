//! Confidence gates and pipeline outcomes.
//!
//! A gate rejection is a normal negative result, not an error. Stages
//! report it as [`Outcome::Rejected`] and callers see it as absence.

use std::fmt;

/// Why a run produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The input is not the kind of request this pipeline handles.
    NotApplicable,
    /// The model's confidence did not clear the threshold.
    LowConfidence,
    /// The input was classified into a category with no handler.
    UnsupportedCategory,
    /// One or more validation checks failed.
    ValidationFailed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "not applicable"),
            Self::LowConfidence => write!(f, "low confidence"),
            Self::UnsupportedCategory => write!(f, "unsupported category"),
            Self::ValidationFailed => write!(f, "validation failed"),
        }
    }
}

/// Result of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Reject(RejectReason),
}

impl GateDecision {
    /// Whether the gate let the input through.
    #[must_use]
    pub fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A strict lower bound on a model-reported confidence score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl ConfidenceGate {
    /// Threshold used throughout the calendar pipelines.
    pub const DEFAULT_THRESHOLD: f64 = 0.7;

    /// Creates a gate with the given threshold.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The threshold a score must exceed.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether `confidence` strictly exceeds the threshold.
    #[must_use]
    pub fn passes(&self, confidence: f64) -> bool {
        confidence > self.threshold
    }

    /// Combines an applicability flag with a confidence score.
    #[must_use]
    pub fn check(&self, applicable: bool, confidence: f64) -> GateDecision {
        if !applicable {
            GateDecision::Reject(RejectReason::NotApplicable)
        } else if !self.passes(confidence) {
            GateDecision::Reject(RejectReason::LowConfidence)
        } else {
            GateDecision::Pass
        }
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

/// What a pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Every stage ran and produced a final result.
    Completed(T),
    /// A gate stopped the run.
    Rejected(RejectReason),
}

impl<T> Outcome<T> {
    /// Whether the run completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The rejection reason, if the run was stopped.
    #[must_use]
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Completed(_) => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }

    /// Collapses a rejection to `None`.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    /// Maps the completed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Rejected(reason) => Outcome::Rejected(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        let gate = ConfidenceGate::default();
        assert!(!gate.passes(0.7));
        assert!(gate.passes(0.700_000_01));
        assert!(gate.passes(0.95));
        assert!(!gate.passes(0.0));
    }

    #[test]
    fn check_reports_the_first_failing_condition() {
        let gate = ConfidenceGate::default();
        assert_eq!(gate.check(true, 0.9), GateDecision::Pass);
        assert_eq!(
            gate.check(false, 0.9),
            GateDecision::Reject(RejectReason::NotApplicable)
        );
        assert_eq!(
            gate.check(true, 0.7),
            GateDecision::Reject(RejectReason::LowConfidence)
        );
        assert_eq!(
            gate.check(false, 0.1),
            GateDecision::Reject(RejectReason::NotApplicable)
        );
    }

    #[test]
    fn custom_threshold() {
        let gate = ConfidenceGate::new(0.5);
        assert_eq!(gate.threshold(), 0.5);
        assert!(gate.passes(0.6));
        assert!(!gate.passes(0.5));
    }

    #[test]
    fn outcome_collapses_rejection() {
        let done: Outcome<u32> = Outcome::Completed(3);
        assert!(done.is_completed());
        assert_eq!(done.clone().map(|n| n * 2), Outcome::Completed(6));
        assert_eq!(done.into_option(), Some(3));

        let rejected: Outcome<u32> = Outcome::Rejected(RejectReason::LowConfidence);
        assert_eq!(rejected.reject_reason(), Some(RejectReason::LowConfidence));
        assert_eq!(rejected.into_option(), None);
    }
}
