//! Hypotheses received from the language model

use crate::comparison::{Metric, Segment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction a hypothesis claims the metric moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Current above baseline
    Increase,
    /// Current below baseline
    Decrease,
}

impl Direction {
    /// Direction of an observed delta, `None` when flat.
    #[must_use]
    pub fn of_delta(delta: f64) -> Option<Self> {
        if delta > 0.0 {
            Some(Self::Increase)
        } else if delta < 0.0 {
            Some(Self::Decrease)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase => f.write_str("increase"),
            Self::Decrease => f.write_str("decrease"),
        }
    }
}

/// A testable claim about one metric on one segment. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Unique within a run
    pub id: String,
    /// Free-form claim
    pub claim_text: String,
    /// Metric the claim is about
    pub target_metric: Metric,
    /// Segment the claim is about
    pub target_segment: Segment,
    /// Claimed movement
    pub claimed_direction: Direction,
    /// Model's own confidence in `[0, 1]`
    pub preliminary_confidence: f64,
}

impl Hypothesis {
    /// Create a hypothesis with a preliminary confidence of 0.5.
    pub fn new(
        id: impl Into<String>,
        claim_text: impl Into<String>,
        target_metric: Metric,
        target_segment: Segment,
        claimed_direction: Direction,
    ) -> Self {
        Self {
            id: id.into(),
            claim_text: claim_text.into(),
            target_metric,
            target_segment,
            claimed_direction,
            preliminary_confidence: 0.5,
        }
    }

    /// Set the preliminary confidence, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_preliminary_confidence(mut self, confidence: f64) -> Self {
        self.preliminary_confidence = clamp_unit(confidence);
        self
    }
}

/// Clamp to `[0, 1]`; non-finite values become 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_of_delta() {
        assert_eq!(Direction::of_delta(0.5), Some(Direction::Increase));
        assert_eq!(Direction::of_delta(-0.5), Some(Direction::Decrease));
        assert_eq!(Direction::of_delta(0.0), None);
    }

    #[test]
    fn test_confidence_clamped() {
        let h = Hypothesis::new("H1", "ctr fell", Metric::Ctr, Segment::Overall, Direction::Decrease)
            .with_preliminary_confidence(1.4);
        assert!((h.preliminary_confidence - 1.0).abs() < f64::EPSILON);
        let h = h.with_preliminary_confidence(f64::NAN);
        assert!(h.preliminary_confidence.abs() < f64::EPSILON);
    }
}
