//! Dataset overview used as model context and in run reports

use super::CleanTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// High-level description of a clean table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Number of records
    pub total_records: usize,
    /// Earliest date, if any record exists
    pub start_date: Option<NaiveDate>,
    /// Latest date, if any record exists
    pub end_date: Option<NaiveDate>,
    /// Distinct campaigns
    pub unique_campaigns: usize,
    /// Sum of spend
    pub total_spend: f64,
    /// Sum of revenue
    pub total_revenue: f64,
    /// Total revenue over total spend (0 without spend)
    pub overall_roas: f64,
    /// Mean per-record CTR
    pub mean_ctr: f64,
    /// Distinct creative types, sorted
    pub creative_types: Vec<String>,
    /// Distinct platforms, sorted
    pub platforms: Vec<String>,
    /// Distinct countries, sorted
    pub countries: Vec<String>,
}

impl DatasetSummary {
    /// Summarise a clean table.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_table(table: &CleanTable) -> Self {
        let records = table.records();

        let total_spend: f64 = records.iter().map(|r| r.spend).sum();
        let total_revenue: f64 = records.iter().map(|r| r.revenue).sum();
        let mean_ctr = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.ctr).sum::<f64>() / records.len() as f64
        };

        let campaigns: BTreeSet<&str> = records.iter().map(|r| r.campaign_name.as_str()).collect();
        let distinct = |f: fn(&super::Record) -> &str| -> Vec<String> {
            records
                .iter()
                .map(f)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        Self {
            total_records: records.len(),
            start_date: table.earliest_date(),
            end_date: table.latest_date(),
            unique_campaigns: campaigns.len(),
            total_spend,
            total_revenue,
            overall_roas: if total_spend > 0.0 { total_revenue / total_spend } else { 0.0 },
            mean_ctr,
            creative_types: distinct(|r| r.creative_type.as_str()),
            platforms: distinct(|r| r.platform.as_str()),
            countries: distinct(|r| r.country.as_str()),
        }
    }

    /// Date range as `start to end`, or `n/a` for an empty table.
    #[must_use]
    pub fn date_range(&self) -> String {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "n/a".to_string(),
        }
    }
}
