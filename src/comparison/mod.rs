//! Baseline-vs-current period comparison
//!
//! Splits a clean table into two adjacent windows of equal length ending at the
//! day after the latest observation, and measures every [`Metric`] on every
//! [`Segment`]:
//!
//! ```text
//!   baseline = [t0 - 2w, t0 - w)     current = [t0 - w, t0)     t0 = max(date) + 1
//! ```
//!
//! Small samples are still reported (flagged with `insufficient_sample`); the
//! evaluator decides what to do with them.

mod evidence;
mod period;

pub use evidence::{Evidence, Metric, Segment};
pub use period::{Period, PeriodWindows};

use crate::dataset::{CleanTable, Record};
use crate::Result;
use chrono::{Days, NaiveDate};
use rustc_hash::FxHashMap;

/// Derives [`Evidence`] from a clean table.
#[derive(Debug, Clone)]
pub struct PeriodComparator {
    min_sample_size: usize,
}

impl Default for PeriodComparator {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Window rows of one segment.
#[derive(Default)]
struct SegmentRows<'a> {
    baseline: Vec<&'a Record>,
    current: Vec<&'a Record>,
}

impl PeriodComparator {
    /// Create a comparator flagging samples below `min_sample_size`.
    #[must_use]
    pub const fn new(min_sample_size: usize) -> Self {
        Self { min_sample_size }
    }

    /// Minimum sample size used for the `insufficient_sample` flag.
    #[must_use]
    pub const fn min_sample_size(&self) -> usize {
        self.min_sample_size
    }

    /// Windows for a table: anchored at the day after its latest date.
    ///
    /// Returns `Ok(None)` for an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if `window_days` is zero.
    pub fn windows(table: &CleanTable, window_days: u32) -> Result<Option<PeriodWindows>> {
        if window_days == 0 {
            return Err(crate::Error::InvalidInput(
                "window_days must be at least 1".to_string(),
            ));
        }
        let Some(latest) = table.latest_date() else {
            return Ok(None);
        };
        let anchor = latest.checked_add_days(Days::new(1)).ok_or_else(|| {
            crate::Error::InvalidInput(format!("latest date {latest} has no successor"))
        })?;
        PeriodWindows::ending_at(anchor, window_days).map(Some)
    }

    /// Compare the two windows ending at the day after the latest date.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if `window_days` is zero.
    pub fn compare(&self, table: &CleanTable, window_days: u32) -> Result<Vec<Evidence>> {
        match Self::windows(table, window_days)? {
            Some(windows) => Ok(self.compare_windows(table, &windows)),
            None => {
                tracing::warn!("comparison skipped: no records");
                Ok(Vec::new())
            }
        }
    }

    /// Compare the two windows ending at an explicit anchor (exclusive).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if `window_days` is zero.
    pub fn compare_at(
        &self,
        table: &CleanTable,
        anchor: NaiveDate,
        window_days: u32,
    ) -> Result<Vec<Evidence>> {
        let windows = PeriodWindows::ending_at(anchor, window_days)?;
        Ok(self.compare_windows(table, &windows))
    }

    /// Evidence for every segment and metric over precomputed windows.
    ///
    /// Order: overall, then campaign, platform and creative-type segments
    /// sorted by name; metrics in [`Metric::ALL`] order within a segment.
    #[must_use]
    pub fn compare_windows(&self, table: &CleanTable, windows: &PeriodWindows) -> Vec<Evidence> {
        let mut groups: FxHashMap<Segment, SegmentRows<'_>> = FxHashMap::default();
        groups.entry(Segment::Overall).or_default();

        for record in table.records() {
            let in_baseline = windows.baseline.contains(record.date);
            if !in_baseline && !windows.current.contains(record.date) {
                continue;
            }
            for segment in [
                Segment::Overall,
                Segment::Campaign(record.campaign_name.clone()),
                Segment::Platform(record.platform.clone()),
                Segment::CreativeType(record.creative_type.clone()),
            ] {
                let rows = groups.entry(segment).or_default();
                if in_baseline {
                    rows.baseline.push(record);
                } else {
                    rows.current.push(record);
                }
            }
        }

        let mut segments: Vec<(Segment, SegmentRows<'_>)> = groups.into_iter().collect();
        segments.sort_by(|a, b| a.0.cmp(&b.0));

        let label = windows.label();
        let evidence: Vec<Evidence> = segments
            .iter()
            .flat_map(|(segment, rows)| {
                Metric::ALL.into_iter().map(|metric| {
                    Evidence::new(
                        metric,
                        segment.clone(),
                        metric.aggregate(&rows.baseline),
                        metric.aggregate(&rows.current),
                        rows.baseline.len(),
                        rows.current.len(),
                    )
                    .with_period_label(label.clone())
                    .with_min_sample_size(self.min_sample_size)
                })
            })
            .collect();

        let insufficient = evidence.iter().filter(|e| e.insufficient_sample).count();
        tracing::info!(
            segments = segments.len(),
            evidence = evidence.len(),
            insufficient = insufficient,
            period = %label,
            "period comparison complete"
        );

        evidence
    }
}
