//! Half-open date windows

use crate::{Error, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// First day included
    pub start: NaiveDate,
    /// First day excluded
    pub end: NaiveDate,
}

impl Period {
    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Number of days covered.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Last day included.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.end)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.last_day())
    }
}

/// Adjacent baseline and current windows of equal length.
///
/// `baseline.end == current.start` always holds, so the windows are disjoint
/// and contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindows {
    /// Earlier window
    pub baseline: Period,
    /// Later window
    pub current: Period,
}

impl PeriodWindows {
    /// Windows ending just before `anchor`:
    /// baseline = `[anchor - 2w, anchor - w)`, current = `[anchor - w, anchor)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `window_days` is zero or the windows
    /// would fall outside the supported date range.
    pub fn ending_at(anchor: NaiveDate, window_days: u32) -> Result<Self> {
        if window_days == 0 {
            return Err(Error::InvalidInput(
                "window_days must be at least 1".to_string(),
            ));
        }
        let width = Days::new(u64::from(window_days));
        let out_of_range = || {
            Error::InvalidInput(format!(
                "a {window_days}-day window before {anchor} is outside the supported date range"
            ))
        };

        let split = anchor.checked_sub_days(width).ok_or_else(out_of_range)?;
        let start = split.checked_sub_days(width).ok_or_else(out_of_range)?;

        Ok(Self {
            baseline: Period { start, end: split },
            current: Period {
                start: split,
                end: anchor,
            },
        })
    }

    /// Label used on evidence, e.g. `baseline 2024-03-01..2024-03-07 vs current 2024-03-08..2024-03-14`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("baseline {} vs current {}", self.baseline, self.current)
    }
}
