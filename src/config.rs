//! Pipeline configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [thresholds]
//! confidence_min = 0.6
//! min_sample_size = 20
//!
//! [retry]
//! max_retries = 3
//! initial_retry_delay = 1.0
//! max_retry_delay = 60.0
//! backoff_factor = 2.0
//!
//! [comparison]
//! baseline_window_days = 7
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for one orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Decision thresholds shared by comparator, evaluator and performer selection
    pub thresholds: Thresholds,
    /// Retry policy for external calls
    pub retry: RetryConfig,
    /// Baseline/current window settings
    pub comparison: ComparisonConfig,
    /// Confidence scoring weights
    pub confidence: ConfidenceWeights,
    /// Data quality score weights
    pub quality: QualityWeights,
    /// Creative generation fan-out
    pub creatives: CreativeConfig,
}

/// Decision thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum confidence for a `confirmed` verdict
    pub confidence_min: f64,
    /// Minimum confidence for a `partially_confirmed` verdict
    pub partial_confidence_min: f64,
    /// CTR below which a campaign counts as a low performer
    pub low_ctr_threshold: f64,
    /// ROAS floor for top performers
    pub low_roas_threshold: f64,
    /// |relative delta| (percent) below which a change is noted as minor
    pub significant_change_pct: f64,
    /// Minimum rows per window before evidence is trusted
    pub min_sample_size: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence_min: 0.6,
            partial_confidence_min: 0.4,
            low_ctr_threshold: 0.01,
            low_roas_threshold: 1.0,
            significant_change_pct: 10.0,
            min_sample_size: 20,
        }
    }
}

/// Retry settings, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per external call
    pub max_retries: u32,
    /// Delay before the second attempt
    pub initial_retry_delay: f64,
    /// Upper bound for any single delay
    pub max_retry_delay: f64,
    /// Multiplier applied after each failed attempt
    pub backoff_factor: f64,
    /// Per-attempt timeout
    pub call_timeout: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay: 1.0,
            max_retry_delay: 60.0,
            backoff_factor: 2.0,
            call_timeout: 30.0,
        }
    }
}

impl RetryConfig {
    /// Initial delay as a `Duration`.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        seconds(self.initial_retry_delay)
    }

    /// Maximum delay as a `Duration`.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        seconds(self.max_retry_delay)
    }

    /// Per-attempt timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        seconds(self.call_timeout)
    }
}

/// Negative and NaN become zero, values too large for a `Duration` saturate.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Baseline/current comparison settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Length of each window in days
    pub baseline_window_days: u32,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            baseline_window_days: 7,
        }
    }
}

/// Weights of the three confidence inputs.
///
/// The weights are normalised by their sum, so only their ratios matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    /// Weight of the sample-size score
    pub sample_size: f64,
    /// Weight of the direction-consistency score
    pub direction: f64,
    /// Weight of the magnitude score
    pub magnitude: f64,
    /// Rows at which the sample-size score saturates at 1.0
    pub sample_saturation: usize,
    /// |relative delta| (percent) at which the magnitude score saturates at 1.0
    pub magnitude_saturation_pct: f64,
    /// Highest confidence a direction-contradicting hypothesis may keep
    pub contradiction_cap: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            sample_size: 0.4,
            direction: 0.3,
            magnitude: 0.3,
            sample_saturation: 100,
            magnitude_saturation_pct: 50.0,
            contradiction_cap: 0.3,
        }
    }
}

/// Penalty weights for the data quality score.
///
/// Each rate-based weight is multiplied by the affected fraction of raw rows
/// (capped at 1) and by 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    /// Missing or unparseable cells
    pub missing_values: f64,
    /// NaN / infinite cells
    pub non_finite_values: f64,
    /// Negative or out-of-range cells
    pub out_of_range_values: f64,
    /// Dropped rows
    pub dropped_rows: f64,
    /// Flat points per synthesized required column
    pub missing_column_penalty: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            missing_values: 0.3,
            non_finite_values: 0.3,
            out_of_range_values: 0.2,
            dropped_rows: 0.5,
            missing_column_penalty: 10.0,
        }
    }
}

/// Creative generation fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreativeConfig {
    /// Low-CTR campaigns that receive creative recommendations
    pub max_campaigns: usize,
    /// Top performers passed as positive examples
    pub max_top_performers: usize,
}

impl Default for CreativeConfig {
    fn default() -> Self {
        Self {
            max_campaigns: 5,
            max_top_performers: 10,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Config`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        check_unit("thresholds.confidence_min", t.confidence_min)?;
        check_unit("thresholds.partial_confidence_min", t.partial_confidence_min)?;
        if t.partial_confidence_min > t.confidence_min {
            return Err(Error::Config(format!(
                "thresholds.partial_confidence_min ({}) must not exceed confidence_min ({})",
                t.partial_confidence_min, t.confidence_min
            )));
        }
        check_unit("thresholds.low_ctr_threshold", t.low_ctr_threshold)?;
        check_non_negative("thresholds.low_roas_threshold", t.low_roas_threshold)?;
        check_non_negative("thresholds.significant_change_pct", t.significant_change_pct)?;

        let r = &self.retry;
        if r.max_retries == 0 {
            return Err(Error::Config("retry.max_retries must be at least 1".to_string()));
        }
        check_non_negative("retry.initial_retry_delay", r.initial_retry_delay)?;
        check_non_negative("retry.max_retry_delay", r.max_retry_delay)?;
        if !r.backoff_factor.is_finite() || r.backoff_factor < 1.0 {
            return Err(Error::Config(format!(
                "retry.backoff_factor must be >= 1.0, got {}",
                r.backoff_factor
            )));
        }
        if !r.call_timeout.is_finite() || r.call_timeout <= 0.0 {
            return Err(Error::Config(format!(
                "retry.call_timeout must be positive, got {}",
                r.call_timeout
            )));
        }

        if self.comparison.baseline_window_days == 0 {
            return Err(Error::Config(
                "comparison.baseline_window_days must be at least 1".to_string(),
            ));
        }

        let c = &self.confidence;
        check_non_negative("confidence.sample_size", c.sample_size)?;
        check_non_negative("confidence.direction", c.direction)?;
        check_non_negative("confidence.magnitude", c.magnitude)?;
        if c.sample_size + c.direction + c.magnitude <= 0.0 {
            return Err(Error::Config(
                "confidence weights must not all be zero".to_string(),
            ));
        }
        if c.sample_saturation == 0 {
            return Err(Error::Config(
                "confidence.sample_saturation must be at least 1".to_string(),
            ));
        }
        if !c.magnitude_saturation_pct.is_finite() || c.magnitude_saturation_pct <= 0.0 {
            return Err(Error::Config(
                "confidence.magnitude_saturation_pct must be positive".to_string(),
            ));
        }
        check_unit("confidence.contradiction_cap", c.contradiction_cap)?;

        let q = &self.quality;
        check_non_negative("quality.missing_values", q.missing_values)?;
        check_non_negative("quality.non_finite_values", q.non_finite_values)?;
        check_non_negative("quality.out_of_range_values", q.out_of_range_values)?;
        check_non_negative("quality.dropped_rows", q.dropped_rows)?;
        check_non_negative("quality.missing_column_penalty", q.missing_column_penalty)?;

        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{name} must be within [0, 1], got {value}")))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{name} must be a non-negative number, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.thresholds.confidence_min - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.thresholds.min_sample_size, 20);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.comparison.baseline_window_days, 7);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = PipelineConfig::from_toml_str(
            r"
            [thresholds]
            confidence_min = 0.75

            [retry]
            max_retries = 5
            backoff_factor = 3.0
            ",
        )
        .unwrap();

        assert!((config.thresholds.confidence_min - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.thresholds.min_sample_size, 20);
        assert_eq!(config.retry.max_retries, 5);
        assert!((config.retry.initial_retry_delay - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        let err = PipelineConfig::from_toml_str("[thresholds]\nconfidence_min = 1.5").unwrap_err();
        assert!(err.to_string().contains("thresholds.confidence_min"));
    }

    #[test]
    fn test_rejects_zero_retries() {
        let err = PipelineConfig::from_toml_str("[retry]\nmax_retries = 0").unwrap_err();
        assert!(err.to_string().contains("retry.max_retries"));
    }

    #[test]
    fn test_rejects_shrinking_backoff() {
        let err = PipelineConfig::from_toml_str("[retry]\nbackoff_factor = 0.5").unwrap_err();
        assert!(err.to_string().contains("backoff_factor"));
    }

    #[test]
    fn test_rejects_partial_above_confirmed() {
        let err = PipelineConfig::from_toml_str(
            "[thresholds]\nconfidence_min = 0.5\npartial_confidence_min = 0.7",
        )
        .unwrap_err();
        assert!(err.to_string().contains("partial_confidence_min"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = PipelineConfig::from_toml_str("[thresholds\nconfidence_min = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_retry_durations() {
        let retry = RetryConfig::default();
        assert_eq!(retry.initial_delay(), Duration::from_secs(1));
        assert_eq!(retry.max_delay(), Duration::from_secs(60));
        assert_eq!(retry.timeout(), Duration::from_secs(30));
    }
}
