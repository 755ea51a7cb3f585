//! Hypothesis evaluation
//!
//! Each [`Hypothesis`] is checked against the [`Evidence`] the comparator
//! derived for exactly its metric and segment, and ends in one of four states:
//!
//! ```text
//!                       ┌─ no evidence / small sample / zero baseline ─> insufficient_data
//!   hypothesis ─ match ─┼─ direction contradicted or no change ───────> refuted
//!                       └─ direction matches ─┬─ conf ≥ min ───────────> confirmed
//!                                             ├─ conf ≥ partial ───────> partially_confirmed
//!                                             └─ otherwise ────────────> refuted
//! ```
//!
//! Evaluations are values: a corrected decision is a new [`Evaluation`].

mod evaluator;
pub mod hypothesis;
mod scoring;

pub use evaluator::Evaluator;
pub use hypothesis::{Direction, Hypothesis};
pub use scoring::{confidence, impact, ConfidenceBreakdown, BREAK_EVEN_ROAS};

use crate::comparison::Evidence;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final state of an evaluated hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Direction matches with confidence at or above `confidence_min`
    Confirmed,
    /// Direction matches with confidence in `[partial_confidence_min, confidence_min)`
    PartiallyConfirmed,
    /// Evidence contradicts the claim
    Refuted,
    /// No usable evidence
    InsufficientData,
}

impl ValidationStatus {
    /// Refuted or insufficient: the hypothesis is not acted on.
    #[must_use]
    pub const fn is_rejected(self) -> bool {
        matches!(self, Self::Refuted | Self::InsufficientData)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Confirmed => "confirmed",
            Self::PartiallyConfirmed => "partially_confirmed",
            Self::Refuted => "refuted",
            Self::InsufficientData => "insufficient_data",
        };
        f.write_str(name)
    }
}

/// Business impact of the observed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    /// `|Δ| > 50 %`, or ROAS below break-even
    Critical,
    /// `25 % ≤ |Δ| ≤ 50 %`
    High,
    /// `10 % ≤ |Δ| < 25 %`
    Medium,
    /// `|Δ| < 10 %` or unknown
    Low,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(name)
    }
}

/// Why a hypothesis could not be tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EvidenceGap {
    /// No evidence for the hypothesis' metric and segment
    NoMatchingEvidence,
    /// Fewer rows than the configured minimum
    SampleTooSmall {
        /// Rows in the smaller window
        sample_size: usize,
        /// Configured minimum
        min_sample_size: usize,
    },
    /// Baseline is zero, so the relative change is undefined
    ZeroBaseline,
}

impl fmt::Display for EvidenceGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchingEvidence => f.write_str("no evidence for the target metric and segment"),
            Self::SampleTooSmall {
                sample_size,
                min_sample_size,
            } => write!(f, "sample size {sample_size} < minimum {min_sample_size}"),
            Self::ZeroBaseline => f.write_str("baseline is zero, relative change undefined"),
        }
    }
}

/// Outcome of evaluating one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    hypothesis_id: String,
    validation_status: ValidationStatus,
    confidence: f64,
    impact: Impact,
    evidence: Option<Evidence>,
    reasoning: String,
}

impl Evaluation {
    /// Create an evaluation. Confidence is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(
        hypothesis_id: impl Into<String>,
        validation_status: ValidationStatus,
        confidence: f64,
        impact: Impact,
        evidence: Option<Evidence>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            hypothesis_id: hypothesis_id.into(),
            validation_status,
            confidence: hypothesis::clamp_unit(confidence),
            impact,
            evidence,
            reasoning: reasoning.into(),
        }
    }

    /// Untestable hypothesis: confidence 0, low impact.
    #[must_use]
    pub fn insufficient(
        hypothesis_id: impl Into<String>,
        gap: EvidenceGap,
        evidence: Option<Evidence>,
    ) -> Self {
        Self::new(
            hypothesis_id,
            ValidationStatus::InsufficientData,
            0.0,
            Impact::Low,
            evidence,
            format!("insufficient_data: {gap}"),
        )
    }

    /// Evaluated hypothesis.
    #[must_use]
    pub fn hypothesis_id(&self) -> &str {
        &self.hypothesis_id
    }

    /// Final state.
    #[must_use]
    pub const fn validation_status(&self) -> ValidationStatus {
        self.validation_status
    }

    /// Confidence in `[0, 1]`.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Impact of the observed change.
    #[must_use]
    pub const fn impact(&self) -> Impact {
        self.impact
    }

    /// Evidence the decision was based on.
    #[must_use]
    pub const fn evidence(&self) -> Option<&Evidence> {
        self.evidence.as_ref()
    }

    /// Thresholds and values that drove the decision.
    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }
}

/// A hypothesis that was not accepted, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEvaluation {
    /// Hypothesis id
    pub hypothesis_id: String,
    /// Refuted or insufficient data
    pub status: ValidationStatus,
    /// Evaluation reasoning
    pub reason: String,
}

/// Status counts over a set of evaluations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Evaluations counted
    pub total: usize,
    /// Confirmed hypotheses
    pub confirmed: usize,
    /// Partially confirmed hypotheses
    pub partially_confirmed: usize,
    /// Refuted hypotheses
    pub refuted: usize,
    /// Hypotheses without usable evidence
    pub insufficient_data: usize,
    /// Refuted and insufficient hypotheses with reasons
    pub rejected: Vec<RejectedEvaluation>,
}

impl EvaluationSummary {
    /// Summarise evaluations.
    #[must_use]
    pub fn from_evaluations(evaluations: &[Evaluation]) -> Self {
        let mut summary = Self {
            total: evaluations.len(),
            ..Self::default()
        };
        for evaluation in evaluations {
            let status = evaluation.validation_status();
            match status {
                ValidationStatus::Confirmed => summary.confirmed += 1,
                ValidationStatus::PartiallyConfirmed => summary.partially_confirmed += 1,
                ValidationStatus::Refuted => summary.refuted += 1,
                ValidationStatus::InsufficientData => summary.insufficient_data += 1,
            }
            if status.is_rejected() {
                summary.rejected.push(RejectedEvaluation {
                    hypothesis_id: evaluation.hypothesis_id().to_string(),
                    status,
                    reason: evaluation.reasoning().to_string(),
                });
            }
        }
        summary
    }

    /// Confirmed plus partially confirmed.
    #[must_use]
    pub const fn supported(&self) -> usize {
        self.confirmed + self.partially_confirmed
    }
}
