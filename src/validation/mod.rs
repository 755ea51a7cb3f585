//! Dataset validation and repair
//!
//! Turns a raw Arrow table into a [`CleanTable`] plus a [`QualityReport`].
//!
//! ## Repair Rules
//!
//! | Defect | Action | Issue |
//! |---|---|---|
//! | `campaign_name` or `date` column absent | fail with [`Error::Schema`] | - |
//! | `spend`/`impressions`/`clicks`/`revenue` column absent | synthesize zeros | `missing_column` |
//! | null / unparseable metric cell | 0 | `missing_value` |
//! | NaN / ±∞ cell | 0 | `non_finite_value` |
//! | negative metric, CTR outside `[0, 1]` | clamp | `out_of_range` |
//! | ROAS > 100 | keep | `suspicious` |
//! | unparseable date | drop row | `dropped_row` |
//! | all key metrics empty or zero | drop row | `dropped_row` |
//!
//! Missing optional columns get documented defaults: `purchases` = 0,
//! `creative_type`/`platform`/`country` = `"unknown"`, `ctr` = clicks /
//! impressions (0 without impressions), `roas` = revenue / spend (0 without spend).

mod columns;
mod issues;

pub use issues::{DataQualityIssue, DropReason, IssueCategory, QualityReport};

use crate::config::QualityWeights;
use crate::dataset::{CleanTable, Record};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Identifier columns; their absence is fatal.
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["campaign_name", "date"];

/// Metric columns that are synthesized (with a penalty) when absent.
pub const REQUIRED_METRIC_COLUMNS: [&str; 4] = ["spend", "impressions", "clicks", "revenue"];

/// ROAS above this is flagged as suspicious.
pub const SUSPICIOUS_ROAS: f64 = 100.0;

const UNKNOWN: &str = "unknown";
const UNKNOWN_CAMPAIGN: &str = "Unknown Campaign";

/// Clean records plus the report describing what was repaired.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Validated records
    pub table: CleanTable,
    /// Quality score, issues and drop/repair counts
    pub report: QualityReport,
}

/// Validates and repairs raw performance tables.
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    weights: QualityWeights,
}

/// Per-column cells, `None` when the column is absent from the raw table.
struct RawColumns {
    campaign: Vec<Option<String>>,
    dates: Vec<Option<NaiveDate>>,
    platform: Option<Vec<Option<String>>>,
    creative_type: Option<Vec<Option<String>>>,
    country: Option<Vec<Option<String>>>,
    metrics: [Option<Vec<Option<f64>>>; 4],
    purchases: Option<Vec<Option<f64>>>,
    ctr: Option<Vec<Option<f64>>>,
    roas: Option<Vec<Option<f64>>>,
}

/// Issue counters keyed by category and column.
#[derive(Default)]
struct Tally {
    counts: BTreeMap<(IssueCategory, &'static str), usize>,
}

impl Tally {
    fn add(&mut self, category: IssueCategory, column: &'static str) {
        *self.counts.entry((category, column)).or_insert(0) += 1;
    }

    fn merge(&mut self, other: Self) {
        for (key, count) in other.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
    }

    fn cells(&self) -> usize {
        self.counts
            .iter()
            .filter(|((category, _), _)| *category != IssueCategory::Suspicious)
            .map(|(_, count)| count)
            .sum()
    }

    fn total(&self, category: IssueCategory) -> usize {
        self.counts
            .iter()
            .filter(|((c, _), _)| *c == category)
            .map(|(_, count)| count)
            .sum()
    }
}

impl DataValidator {
    /// Create a validator with custom quality weights.
    #[must_use]
    pub const fn new(weights: QualityWeights) -> Self {
        Self { weights }
    }

    /// Validate and repair a raw table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if `campaign_name` or `date` is absent. All other
    /// defects are repaired and reported.
    pub fn validate(&self, batch: &RecordBatch) -> Result<ValidationOutcome> {
        let raw_rows = batch.num_rows();
        tracing::info!(rows = raw_rows, columns = batch.num_columns(), "validating dataset");

        let index = column_index(batch);
        let missing: Vec<String> = IDENTIFIER_COLUMNS
            .iter()
            .filter(|name| !index.contains_key(**name))
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            tracing::error!(missing = ?missing, "required identifier columns absent");
            return Err(Error::Schema { missing });
        }

        let mut tally = Tally::default();
        let mut structural = Vec::new();
        let raw = extract_columns(batch, &index, &mut structural);

        let mut records = Vec::with_capacity(raw_rows);
        let mut dropped_unparseable_date = 0;
        let mut dropped_empty_metrics = 0;
        let mut repaired_rows = 0;

        for row in 0..raw_rows {
            let Some(date) = raw.dates[row] else {
                dropped_unparseable_date += 1;
                continue;
            };

            let mut row_tally = Tally::default();
            match repair_row(&raw, row, date, &mut row_tally) {
                Some(record) => {
                    if row_tally.cells() > 0 {
                        repaired_rows += 1;
                    }
                    tally.merge(row_tally);
                    records.push(record);
                }
                None => dropped_empty_metrics += 1,
            }
        }

        let mut issues = structural;
        issues.extend(tally.counts.iter().map(|(&(category, column), &count)| {
            let issue = DataQualityIssue {
                category,
                column: Some(column.to_string()),
                count,
                message: describe(category, column, count),
            };
            tracing::warn!(
                category = %issue.category,
                column = column,
                count = count,
                "{}",
                issue.message
            );
            issue
        }));
        for (reason, count) in [
            (DropReason::UnparseableDate, dropped_unparseable_date),
            (DropReason::EmptyMetrics, dropped_empty_metrics),
        ] {
            if count > 0 {
                let message = match reason {
                    DropReason::UnparseableDate => {
                        format!("Dropped {count} row(s) with a missing or unparseable date")
                    }
                    DropReason::EmptyMetrics => {
                        format!("Dropped {count} row(s) with no spend, impressions, clicks or revenue")
                    }
                };
                tracing::warn!(reason = ?reason, count = count, "{message}");
                issues.push(DataQualityIssue {
                    category: IssueCategory::DroppedRow,
                    column: None,
                    count,
                    message,
                });
            }
        }

        let missing_columns = issues
            .iter()
            .filter(|issue| issue.category == IssueCategory::MissingColumn)
            .count();
        let dropped = dropped_unparseable_date + dropped_empty_metrics;
        let quality_score = if records.is_empty() {
            0.0
        } else {
            self.score(raw_rows, &tally, dropped, missing_columns)
        };

        let report = QualityReport {
            raw_rows,
            clean_rows: records.len(),
            dropped_unparseable_date,
            dropped_empty_metrics,
            repaired_rows,
            repaired_cells: tally.cells(),
            quality_score,
            issues,
        };

        tracing::info!(
            clean_rows = report.clean_rows,
            dropped = report.dropped_rows(),
            repaired_rows = report.repaired_rows,
            quality_score = report.quality_score,
            "dataset validated"
        );

        Ok(ValidationOutcome {
            table: CleanTable::new(records),
            report,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(&self, raw_rows: usize, tally: &Tally, dropped: usize, missing_columns: usize) -> f64 {
        let rate = |count: usize| {
            if raw_rows == 0 {
                0.0
            } else {
                (count as f64 / raw_rows as f64).min(1.0)
            }
        };
        let w = &self.weights;
        let penalty = w.missing_values * rate(tally.total(IssueCategory::MissingValue)) * 100.0
            + w.non_finite_values * rate(tally.total(IssueCategory::NonFiniteValue)) * 100.0
            + w.out_of_range_values * rate(tally.total(IssueCategory::OutOfRange)) * 100.0
            + w.dropped_rows * rate(dropped) * 100.0
            + w.missing_column_penalty * missing_columns as f64;

        (100.0 - penalty).clamp(0.0, 100.0)
    }
}

fn column_index(batch: &RecordBatch) -> HashMap<String, usize> {
    let schema = batch.schema();
    let mut index = HashMap::new();
    for (i, field) in schema.fields().iter().enumerate() {
        // First occurrence wins for duplicate names after normalisation
        index.entry(field.name().trim().to_lowercase()).or_insert(i);
    }
    index
}

fn extract_columns(
    batch: &RecordBatch,
    index: &HashMap<String, usize>,
    structural: &mut Vec<DataQualityIssue>,
) -> RawColumns {
    let rows = batch.num_rows();
    let column = |name: &str| index.get(name).map(|&i| batch.column(i));

    // Columns of an unsupported type read as all-null, so every cell is
    // reported as a missing value.
    let text = |name: &str| {
        column(name).map(|array| {
            columns::strings(array).unwrap_or_else(|| {
                unusable(name);
                vec![None; rows]
            })
        })
    };
    let numeric = |name: &str| {
        column(name).map(|array| {
            columns::numbers(array).unwrap_or_else(|| {
                unusable(name);
                vec![None; rows]
            })
        })
    };

    let campaign = text("campaign_name").unwrap_or_else(|| vec![None; rows]);
    let dates = column("date").map_or_else(|| vec![None; rows], columns::dates);

    let metrics = REQUIRED_METRIC_COLUMNS.map(|name| {
        let values = numeric(name);
        if values.is_none() {
            let message = format!("Missing required column '{name}', synthesized with 0");
            tracing::warn!(column = name, "{message}");
            structural.push(DataQualityIssue {
                category: IssueCategory::MissingColumn,
                column: Some(name.to_string()),
                count: rows,
                message,
            });
        }
        values
    });

    RawColumns {
        campaign,
        dates,
        platform: text("platform"),
        creative_type: text("creative_type"),
        country: text("country"),
        metrics,
        purchases: numeric("purchases"),
        ctr: numeric("ctr"),
        roas: numeric("roas"),
    }
}

fn unusable(name: &str) {
    tracing::warn!(column = name, "column has an unsupported type, treated as empty");
}

/// Repair one cell of a non-negative metric.
fn repair_metric(value: Option<f64>, column: &'static str, tally: &mut Tally) -> f64 {
    match value {
        None => {
            tally.add(IssueCategory::MissingValue, column);
            0.0
        }
        Some(v) if !v.is_finite() => {
            tally.add(IssueCategory::NonFiniteValue, column);
            0.0
        }
        Some(v) if v < 0.0 => {
            tally.add(IssueCategory::OutOfRange, column);
            0.0
        }
        Some(v) => v,
    }
}

/// Repair a provided ratio cell. Returns `None` when it must be recomputed.
fn repair_ratio(
    value: Option<f64>,
    column: &'static str,
    upper: Option<f64>,
    tally: &mut Tally,
) -> Option<f64> {
    match value {
        None => {
            tally.add(IssueCategory::MissingValue, column);
            None
        }
        Some(v) if !v.is_finite() => {
            tally.add(IssueCategory::NonFiniteValue, column);
            None
        }
        Some(v) if v < 0.0 || upper.is_some_and(|max| v > max) => {
            tally.add(IssueCategory::OutOfRange, column);
            Some(v.clamp(0.0, upper.unwrap_or(f64::MAX)))
        }
        Some(v) => Some(v),
    }
}

fn category_cell(
    column: Option<&Vec<Option<String>>>,
    row: usize,
    name: &'static str,
    default: &str,
    tally: &mut Tally,
) -> String {
    match column {
        None => default.to_string(),
        Some(values) => values[row].clone().unwrap_or_else(|| {
            tally.add(IssueCategory::MissingValue, name);
            default.to_string()
        }),
    }
}

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
fn repair_row(raw: &RawColumns, row: usize, date: NaiveDate, tally: &mut Tally) -> Option<Record> {
    let cells: [Option<Option<f64>>; 4] =
        std::array::from_fn(|i| raw.metrics[i].as_ref().map(|values| values[row]));

    // Absent columns contribute nothing; a row with every present metric
    // cell empty has no activity to repair.
    let [spend, impressions, clicks, revenue] = {
        let mut repaired = [0.0; 4];
        for (i, cell) in cells.iter().enumerate() {
            if let Some(value) = cell {
                repaired[i] = repair_metric(*value, REQUIRED_METRIC_COLUMNS[i], tally);
            }
        }
        repaired
    };
    if spend + impressions + clicks + revenue <= 0.0 {
        return None;
    }

    let impressions = impressions.round() as u64;
    let clicks = clicks.round() as u64;
    let purchases = raw.purchases.as_ref().map_or(0, |values| {
        repair_metric(values[row], "purchases", tally).round() as u64
    });

    let ctr = raw
        .ctr
        .as_ref()
        .and_then(|values| repair_ratio(values[row], "ctr", Some(1.0), tally))
        .unwrap_or_else(|| {
            if impressions > 0 {
                let derived = clicks as f64 / impressions as f64;
                if derived > 1.0 {
                    tally.add(IssueCategory::OutOfRange, "ctr");
                }
                derived.min(1.0)
            } else {
                0.0
            }
        });

    let roas = raw
        .roas
        .as_ref()
        .and_then(|values| repair_ratio(values[row], "roas", None, tally))
        .unwrap_or(if spend > 0.0 { revenue / spend } else { 0.0 });
    if roas > SUSPICIOUS_ROAS {
        tally.add(IssueCategory::Suspicious, "roas");
    }

    let campaign_name = raw.campaign[row].clone().unwrap_or_else(|| {
        tally.add(IssueCategory::MissingValue, "campaign_name");
        UNKNOWN_CAMPAIGN.to_string()
    });

    Some(Record {
        campaign_name,
        date,
        platform: category_cell(raw.platform.as_ref(), row, "platform", UNKNOWN, tally),
        creative_type: category_cell(raw.creative_type.as_ref(), row, "creative_type", UNKNOWN, tally),
        country: category_cell(raw.country.as_ref(), row, "country", UNKNOWN, tally),
        spend,
        impressions,
        clicks,
        purchases,
        revenue,
        ctr,
        roas,
    })
}

fn describe(category: IssueCategory, column: &str, count: usize) -> String {
    match category {
        IssueCategory::MissingValue => {
            format!("Filled {count} missing or unparseable value(s) in '{column}' with a default")
        }
        IssueCategory::NonFiniteValue => {
            format!("Replaced {count} NaN/infinite value(s) in '{column}' with 0")
        }
        IssueCategory::OutOfRange => {
            format!("Clamped {count} out-of-range value(s) in '{column}'")
        }
        IssueCategory::Suspicious => {
            format!("Found {count} value(s) in '{column}' above {SUSPICIOUS_ROAS} (suspicious, kept)")
        }
        IssueCategory::MissingColumn | IssueCategory::DroppedRow => {
            format!("{count} {category} issue(s) in '{column}'")
        }
    }
}
