//! Data quality issues and the quality report

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a repaired or flagged defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// A required metric column was absent and synthesized
    MissingColumn,
    /// Null, empty or unparseable cell filled with a default
    MissingValue,
    /// NaN or infinite cell coerced to 0
    NonFiniteValue,
    /// Negative value or CTR outside `[0, 1]`, clamped
    OutOfRange,
    /// Kept as-is but implausible (ROAS above 100)
    Suspicious,
    /// Row removed from the clean table
    DroppedRow,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingColumn => "missing_column",
            Self::MissingValue => "missing_value",
            Self::NonFiniteValue => "non_finite_value",
            Self::OutOfRange => "out_of_range",
            Self::Suspicious => "suspicious",
            Self::DroppedRow => "dropped_row",
        };
        f.write_str(name)
    }
}

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The date cell was null or could not be parsed
    UnparseableDate,
    /// Spend, impressions, clicks and revenue were all empty or zero
    EmptyMetrics,
}

/// One data quality warning, aggregated per category and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    /// Defect category
    pub category: IssueCategory,
    /// Affected column (`None` for row-level issues)
    pub column: Option<String>,
    /// Affected cells or rows
    pub count: usize,
    /// Human-readable description of the repair
    pub message: String,
}

/// Outcome of validating one raw table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Rows in the raw table
    pub raw_rows: usize,
    /// Rows in the clean table
    pub clean_rows: usize,
    /// Rows dropped for an unparseable date
    pub dropped_unparseable_date: usize,
    /// Rows dropped for having no metric activity
    pub dropped_empty_metrics: usize,
    /// Surviving rows with at least one repaired cell
    pub repaired_rows: usize,
    /// Repaired cells across surviving rows
    pub repaired_cells: usize,
    /// Score in `[0, 100]`
    pub quality_score: f64,
    /// Aggregated issues, ordered by category then column
    pub issues: Vec<DataQualityIssue>,
}

impl QualityReport {
    /// Total dropped rows.
    #[must_use]
    pub const fn dropped_rows(&self) -> usize {
        self.dropped_unparseable_date + self.dropped_empty_metrics
    }

    /// Sum of counts for one category.
    #[must_use]
    pub fn count(&self, category: IssueCategory) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.category == category)
            .map(|issue| issue.count)
            .sum()
    }

    /// Issues for one column.
    pub fn issues_for_column<'a>(
        &'a self,
        column: &'a str,
    ) -> impl Iterator<Item = &'a DataQualityIssue> + 'a {
        self.issues
            .iter()
            .filter(move |issue| issue.column.as_deref() == Some(column))
    }
}
