//! Confidence and impact scoring

use super::hypothesis::Direction;
use super::Impact;
use crate::comparison::{Evidence, Metric};
use crate::config::ConfidenceWeights;

/// ROAS below this loses money on every unit of spend.
pub const BREAK_EVEN_ROAS: f64 = 1.0;

/// Components of a confidence score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceBreakdown {
    /// `min(1, n / sample_saturation)`
    pub sample: f64,
    /// 1 when the claimed direction matches the observed one, else 0
    pub direction: f64,
    /// `min(1, |relative delta| / magnitude_saturation_pct)`
    pub magnitude: f64,
    /// Weighted mean of the three components
    pub combined: f64,
}

/// Score how strongly `evidence` supports a claim in `claimed` direction.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence(
    weights: &ConfidenceWeights,
    evidence: &Evidence,
    relative_delta_pct: f64,
    claimed: Direction,
) -> ConfidenceBreakdown {
    let sample = if weights.sample_saturation == 0 {
        1.0
    } else {
        (evidence.sample_size as f64 / weights.sample_saturation as f64).min(1.0)
    };
    let direction = if Direction::of_delta(evidence.absolute_delta) == Some(claimed) {
        1.0
    } else {
        0.0
    };
    let magnitude = if weights.magnitude_saturation_pct > 0.0 {
        (relative_delta_pct.abs() / weights.magnitude_saturation_pct).min(1.0)
    } else {
        1.0
    };

    let total = weights.sample_size + weights.direction + weights.magnitude;
    let combined = if total > 0.0 {
        (weights.sample_size * sample + weights.direction * direction + weights.magnitude * magnitude)
            / total
    } else {
        0.0
    };

    ConfidenceBreakdown {
        sample,
        direction,
        magnitude,
        combined: combined.clamp(0.0, 1.0),
    }
}

/// Impact of an observed change.
///
/// `> 50 %` critical, `[25, 50] %` high, `[10, 25) %` medium, otherwise low.
/// A ROAS below break-even is critical regardless of the change.
#[must_use]
pub fn impact(evidence: &Evidence, relative_delta_pct: f64) -> Impact {
    if evidence.metric == Metric::Roas && evidence.current_value < BREAK_EVEN_ROAS {
        return Impact::Critical;
    }
    let magnitude = relative_delta_pct.abs();
    if magnitude > 50.0 {
        Impact::Critical
    } else if magnitude >= 25.0 {
        Impact::High
    } else if magnitude >= 10.0 {
        Impact::Medium
    } else {
        Impact::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::Segment;

    fn evidence(metric: Metric, baseline: f64, current: f64, n: usize) -> Evidence {
        Evidence::new(metric, Segment::Overall, baseline, current, n, n)
    }

    #[test]
    fn test_confidence_worked_example() {
        // n = 150, ctr 2.5% -> 1.7%
        let ev = evidence(Metric::Ctr, 0.025, 0.017, 150);
        let rel = ev.relative_delta_pct.unwrap();
        let score = confidence(&ConfidenceWeights::default(), &ev, rel, Direction::Decrease);
        assert!((score.sample - 1.0).abs() < f64::EPSILON);
        assert!((score.direction - 1.0).abs() < f64::EPSILON);
        assert!((score.magnitude - 0.64).abs() < 1e-9);
        assert!((score.combined - 0.892).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_direction_scores_zero_direction() {
        let ev = evidence(Metric::Ctr, 0.025, 0.017, 150);
        let rel = ev.relative_delta_pct.unwrap();
        let score = confidence(&ConfidenceWeights::default(), &ev, rel, Direction::Increase);
        assert!(score.direction.abs() < f64::EPSILON);
        assert!(score.combined <= 0.7 + 1e-12);
    }

    #[test]
    fn test_impact_boundaries() {
        let ev = evidence(Metric::Ctr, 1.0, 1.0, 100);
        assert_eq!(impact(&ev, 50.1), Impact::Critical);
        assert_eq!(impact(&ev, -50.0), Impact::High);
        assert_eq!(impact(&ev, 25.0), Impact::High);
        assert_eq!(impact(&ev, 24.9), Impact::Medium);
        assert_eq!(impact(&ev, 10.0), Impact::Medium);
        assert_eq!(impact(&ev, 9.9), Impact::Low);
    }

    #[test]
    fn test_roas_below_break_even_is_critical() {
        let ev = evidence(Metric::Roas, 1.02, 0.98, 100);
        assert_eq!(impact(&ev, ev.relative_delta_pct.unwrap()), Impact::Critical);
    }
}
