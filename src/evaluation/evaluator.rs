//! Hypothesis evaluator

use super::scoring::{confidence, impact};
use super::{Direction, Evaluation, EvidenceGap, Hypothesis, ValidationStatus};
use crate::comparison::Evidence;
use crate::config::{ConfidenceWeights, PipelineConfig, Thresholds};
use crate::decision_log::{Component, DecisionLog, DecisionLogEntry};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde_json::json;

/// Scores hypotheses against evidence.
///
/// Evaluation is a pure function of the hypotheses, the evidence and the
/// configuration: re-running it yields identical evaluations.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    thresholds: Thresholds,
    weights: ConfidenceWeights,
}

impl Evaluator {
    /// Create an evaluator.
    #[must_use]
    pub const fn new(thresholds: Thresholds, weights: ConfidenceWeights) -> Self {
        Self {
            thresholds,
            weights,
        }
    }

    /// Create an evaluator from pipeline configuration.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.thresholds.clone(), config.confidence.clone())
    }

    /// Decision thresholds in use.
    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate every hypothesis and append one decision per hypothesis to `log`.
    ///
    /// Output order matches input order.
    pub fn evaluate(
        &self,
        hypotheses: &[Hypothesis],
        evidence: &[Evidence],
        log: &mut DecisionLog,
    ) -> Vec<Evaluation> {
        #[cfg(feature = "rayon")]
        let evaluations: Vec<Evaluation> = hypotheses
            .par_iter()
            .map(|hypothesis| self.evaluate_one(hypothesis, evidence))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let evaluations: Vec<Evaluation> = hypotheses
            .iter()
            .map(|hypothesis| self.evaluate_one(hypothesis, evidence))
            .collect();

        for (hypothesis, evaluation) in hypotheses.iter().zip(&evaluations) {
            log.record(
                DecisionLogEntry::builder(Component::Evaluator, "hypothesis_evaluated")
                    .reasoning(evaluation.reasoning())
                    .inputs(json!({
                        "hypothesis_id": hypothesis.id,
                        "target_metric": hypothesis.target_metric,
                        "target_segment": hypothesis.target_segment,
                        "claimed_direction": hypothesis.claimed_direction,
                        "preliminary_confidence": hypothesis.preliminary_confidence,
                    }))
                    .outputs(json!({
                        "validation_status": evaluation.validation_status(),
                        "confidence": evaluation.confidence(),
                        "impact": evaluation.impact(),
                        "evidence": evaluation.evidence(),
                    })),
            );
        }

        evaluations
    }

    /// Evidence matching the hypothesis' metric and segment; the largest sample
    /// wins, the earliest on ties.
    #[must_use]
    pub fn find_evidence<'a>(
        hypothesis: &Hypothesis,
        evidence: &'a [Evidence],
    ) -> Option<&'a Evidence> {
        evidence
            .iter()
            .filter(|e| e.metric == hypothesis.target_metric && e.segment == hypothesis.target_segment)
            .fold(None, |best: Option<&Evidence>, e| match best {
                Some(b) if b.sample_size >= e.sample_size => Some(b),
                _ => Some(e),
            })
    }

    /// Evaluate one hypothesis without logging.
    #[must_use]
    pub fn evaluate_one(&self, hypothesis: &Hypothesis, evidence: &[Evidence]) -> Evaluation {
        let Some(matched) = Self::find_evidence(hypothesis, evidence) else {
            return Evaluation::insufficient(&hypothesis.id, EvidenceGap::NoMatchingEvidence, None);
        };

        let min_sample_size = self.thresholds.min_sample_size;
        if matched.sample_size < min_sample_size {
            return Evaluation::insufficient(
                &hypothesis.id,
                EvidenceGap::SampleTooSmall {
                    sample_size: matched.sample_size,
                    min_sample_size,
                },
                Some(matched.clone()),
            );
        }

        let Some(relative) = matched.relative_delta_pct else {
            return Evaluation::insufficient(
                &hypothesis.id,
                EvidenceGap::ZeroBaseline,
                Some(matched.clone()),
            );
        };

        let claimed = hypothesis.claimed_direction;
        let score = confidence(&self.weights, matched, relative, claimed);
        let impact = impact(matched, relative);
        let observed = Direction::of_delta(matched.absolute_delta);
        let t = &self.thresholds;

        let change = format!(
            "{} on {} {} {:.1}% (baseline {:.4} -> current {:.4}, n={})",
            matched.metric,
            matched.segment,
            observed.map_or("did not change", |d| match d {
                Direction::Increase => "rose",
                Direction::Decrease => "fell",
            }),
            relative.abs(),
            matched.baseline_value,
            matched.current_value,
            matched.sample_size,
        );

        let (status, confidence, reasoning) = match observed {
            None => (
                ValidationStatus::Refuted,
                score.combined.min(self.weights.contradiction_cap),
                format!("refuted: claimed {claimed} but {change}"),
            ),
            Some(direction) if direction != claimed => (
                ValidationStatus::Refuted,
                score.combined.min(self.weights.contradiction_cap),
                format!(
                    "refuted: claimed {claimed} but {change}; confidence capped at {:.2}",
                    self.weights.contradiction_cap
                ),
            ),
            Some(_) if score.combined >= t.confidence_min => {
                let minor = if relative.abs() < t.significant_change_pct {
                    format!(
                        " (|change| {:.1}% below the {:.1}% significance level)",
                        relative.abs(),
                        t.significant_change_pct
                    )
                } else {
                    String::new()
                };
                (
                    ValidationStatus::Confirmed,
                    score.combined,
                    format!(
                        "confirmed: {change}; confidence {:.2} >= {:.2}{minor}",
                        score.combined, t.confidence_min
                    ),
                )
            }
            Some(_) if score.combined >= t.partial_confidence_min => (
                ValidationStatus::PartiallyConfirmed,
                score.combined,
                format!(
                    "partially_confirmed: {change}; confidence {:.2} in [{:.2}, {:.2})",
                    score.combined, t.partial_confidence_min, t.confidence_min
                ),
            ),
            Some(_) => (
                ValidationStatus::Refuted,
                score.combined,
                format!(
                    "refuted: {change}; confidence {:.2} < {:.2}",
                    score.combined, t.partial_confidence_min
                ),
            ),
        };

        Evaluation::new(
            &hypothesis.id,
            status,
            confidence,
            impact,
            Some(matched.clone()),
            reasoning,
        )
    }
}
