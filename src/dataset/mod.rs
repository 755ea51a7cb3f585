//! Typed performance records produced by the validator
//!
//! A [`CleanTable`] only ever holds records that passed validation, so every
//! numeric field is finite, non-negative, and `ctr` lies in `[0, 1]`.

mod summary;

pub use summary::DatasetSummary;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One validated observation: a campaign on a platform on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Campaign identifier
    pub campaign_name: String,
    /// Observation date
    pub date: NaiveDate,
    /// Ad platform (e.g. "facebook", "instagram")
    pub platform: String,
    /// Creative format (e.g. "video", "image")
    pub creative_type: String,
    /// Country code or name
    pub country: String,
    /// Spend in account currency
    pub spend: f64,
    /// Impressions served
    pub impressions: u64,
    /// Clicks received
    pub clicks: u64,
    /// Purchases attributed
    pub purchases: u64,
    /// Revenue attributed
    pub revenue: f64,
    /// Click-through rate in `[0, 1]`
    pub ctr: f64,
    /// Return on ad spend
    pub roas: f64,
}

impl Record {
    /// Build a record and derive `ctr` and `roas` from the raw counters.
    ///
    /// Intended for fixtures and adapters that already hold clean values.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        campaign_name: impl Into<String>,
        date: NaiveDate,
        platform: impl Into<String>,
        creative_type: impl Into<String>,
        spend: f64,
        impressions: u64,
        clicks: u64,
        revenue: f64,
    ) -> Self {
        let ctr = if impressions > 0 {
            (clicks as f64 / impressions as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let roas = if spend > 0.0 { revenue / spend } else { 0.0 };
        Self {
            campaign_name: campaign_name.into(),
            date,
            platform: platform.into(),
            creative_type: creative_type.into(),
            country: "unknown".to_string(),
            spend,
            impressions,
            clicks,
            purchases: 0,
            revenue,
            ctr,
            roas,
        }
    }

    /// Override the derived CTR (clamped to `[0, 1]`).
    #[must_use]
    pub fn with_ctr(mut self, ctr: f64) -> Self {
        self.ctr = if ctr.is_finite() { ctr.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Set the country.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Set the purchase count.
    #[must_use]
    pub const fn with_purchases(mut self, purchases: u64) -> Self {
        self.purchases = purchases;
        self
    }
}

/// Validated records, owned by one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanTable {
    records: Vec<Record>,
}

impl CleanTable {
    /// Wrap already-validated records.
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// All records in input order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record survived validation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest observation date, if any.
    #[must_use]
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    /// Earliest observation date, if any.
    #[must_use]
    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).min()
    }
}
