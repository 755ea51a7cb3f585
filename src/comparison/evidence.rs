//! Metrics, segments and evidence values

use crate::dataset::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric compared between windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Mean per-row click-through rate
    Ctr,
    /// Total revenue over total spend
    Roas,
    /// Total spend
    Spend,
    /// Total revenue
    Revenue,
    /// Total impressions
    Impressions,
    /// Total clicks
    Clicks,
}

impl Metric {
    /// Every metric, in report order.
    pub const ALL: [Self; 6] = [
        Self::Ctr,
        Self::Roas,
        Self::Spend,
        Self::Revenue,
        Self::Impressions,
        Self::Clicks,
    ];

    /// Aggregate the metric over a window's rows.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aggregate(self, rows: &[&Record]) -> f64 {
        match self {
            Self::Ctr => {
                if rows.is_empty() {
                    0.0
                } else {
                    rows.iter().map(|r| r.ctr).sum::<f64>() / rows.len() as f64
                }
            }
            Self::Roas => {
                let spend: f64 = rows.iter().map(|r| r.spend).sum();
                let revenue: f64 = rows.iter().map(|r| r.revenue).sum();
                if spend > 0.0 {
                    revenue / spend
                } else {
                    0.0
                }
            }
            Self::Spend => rows.iter().map(|r| r.spend).sum(),
            Self::Revenue => rows.iter().map(|r| r.revenue).sum(),
            Self::Impressions => rows.iter().map(|r| r.impressions as f64).sum(),
            Self::Clicks => rows.iter().map(|r| r.clicks as f64).sum(),
        }
    }

    /// Wire name (`ctr`, `roas`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ctr => "ctr",
            Self::Roas => "roas",
            Self::Spend => "spend",
            Self::Revenue => "revenue",
            Self::Impressions => "impressions",
            Self::Clicks => "clicks",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slice of the dataset a piece of evidence describes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Segment {
    /// Every row
    Overall,
    /// Rows of one campaign
    Campaign(String),
    /// Rows of one platform
    Platform(String),
    /// Rows of one creative type
    CreativeType(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overall => f.write_str("overall"),
            Self::Campaign(name) => write!(f, "campaign '{name}'"),
            Self::Platform(name) => write!(f, "platform '{name}'"),
            Self::CreativeType(name) => write!(f, "creative type '{name}'"),
        }
    }
}

/// Baseline-vs-current measurement of one metric on one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Measured metric
    pub metric: Metric,
    /// Measured segment
    pub segment: Segment,
    /// Aggregate over the baseline window
    pub baseline_value: f64,
    /// Aggregate over the current window
    pub current_value: f64,
    /// `current - baseline`
    pub absolute_delta: f64,
    /// `absolute_delta / baseline * 100`, `None` for a zero baseline
    pub relative_delta_pct: Option<f64>,
    /// `min(baseline_sample_size, current_sample_size)`
    pub sample_size: usize,
    /// Rows in the baseline window
    pub baseline_sample_size: usize,
    /// Rows in the current window
    pub current_sample_size: usize,
    /// Window description
    pub period_label: String,
    /// `sample_size` is below the configured minimum
    pub insufficient_sample: bool,
}

impl Evidence {
    /// Build evidence from two aggregates, deriving the deltas.
    #[must_use]
    pub fn new(
        metric: Metric,
        segment: Segment,
        baseline_value: f64,
        current_value: f64,
        baseline_sample_size: usize,
        current_sample_size: usize,
    ) -> Self {
        let absolute_delta = current_value - baseline_value;
        let relative_delta_pct =
            (baseline_value != 0.0).then(|| absolute_delta / baseline_value * 100.0);
        Self {
            metric,
            segment,
            baseline_value,
            current_value,
            absolute_delta,
            relative_delta_pct,
            sample_size: baseline_sample_size.min(current_sample_size),
            baseline_sample_size,
            current_sample_size,
            period_label: String::new(),
            insufficient_sample: false,
        }
    }

    /// Attach the window label.
    #[must_use]
    pub fn with_period_label(mut self, label: impl Into<String>) -> Self {
        self.period_label = label.into();
        self
    }

    /// Flag samples below `min_sample_size`.
    #[must_use]
    pub const fn with_min_sample_size(mut self, min_sample_size: usize) -> Self {
        self.insufficient_sample = self.sample_size < min_sample_size;
        self
    }
}
