//! Shared fixtures for integration tests
//!
//! Four campaigns over 14 days (2024-03-01 ..= 2024-03-14), five rows per
//! campaign per day, so each campaign has 35 rows in each 7-day window:
//!
//! | campaign | platform | creative | baseline ctr | current ctr | roas |
//! |---|---|---|---|---|---|
//! | Evergreen | facebook | image | 0.030 | 0.030 | 4.0 -> 4.0 |
//! | Spring Sale | instagram | video | 0.025 | 0.017 | 3.0 -> 2.0 |
//! | Flash Deal | instagram | carousel | 0.008 | 0.006 | 2.0 -> 2.0 |
//! | Clearance | facebook | carousel | 0.005 | 0.005 | 0.75 -> 0.75 |

#![allow(dead_code)]

use ads_evidence::config::PipelineConfig;
use ads_evidence::dataset::CleanTable;
use ads_evidence::llm::{PromptTask, ScriptedModel};
use ads_evidence::validation::DataValidator;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

/// Rows per campaign per day.
pub const ROWS_PER_DAY: usize = 5;

/// One raw input row. `None` cells become Arrow nulls.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub campaign: Option<&'static str>,
    pub date: Option<String>,
    pub platform: Option<&'static str>,
    pub creative_type: Option<&'static str>,
    pub spend: Option<f64>,
    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
    pub revenue: Option<f64>,
}

impl RawRow {
    pub fn new(
        campaign: &'static str,
        date: NaiveDate,
        platform: &'static str,
        creative_type: &'static str,
        spend: f64,
        impressions: i64,
        clicks: i64,
        revenue: f64,
    ) -> Self {
        Self {
            campaign: Some(campaign),
            date: Some(date.format("%Y-%m-%d").to_string()),
            platform: Some(platform),
            creative_type: Some(creative_type),
            spend: Some(spend),
            impressions: Some(impressions),
            clicks: Some(clicks),
            revenue: Some(revenue),
        }
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

pub fn schema() -> Schema {
    Schema::new(vec![
        Field::new("campaign_name", DataType::Utf8, true),
        Field::new("date", DataType::Utf8, true),
        Field::new("platform", DataType::Utf8, true),
        Field::new("creative_type", DataType::Utf8, true),
        Field::new("spend", DataType::Float64, true),
        Field::new("impressions", DataType::Int64, true),
        Field::new("clicks", DataType::Int64, true),
        Field::new("revenue", DataType::Float64, true),
    ])
}

/// Build a raw batch with the standard column set.
pub fn raw_batch(rows: &[RawRow]) -> RecordBatch {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(rows.iter().map(|r| r.campaign).collect::<Vec<_>>())),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.date.as_deref()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(rows.iter().map(|r| r.platform).collect::<Vec<_>>())),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.creative_type).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(rows.iter().map(|r| r.spend).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.impressions).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.clicks).collect::<Vec<_>>())),
        Arc::new(Float64Array::from(rows.iter().map(|r| r.revenue).collect::<Vec<_>>())),
    ];
    RecordBatch::try_new(Arc::new(schema()), columns).unwrap()
}

/// The four-campaign fixture described in the module docs.
pub fn campaign_rows() -> Vec<RawRow> {
    let mut rows = Vec::new();
    for d in 1..=14 {
        let current = d >= 8;
        for _ in 0..ROWS_PER_DAY {
            rows.push(RawRow::new("Evergreen", day(d), "facebook", "image", 100.0, 10_000, 300, 400.0));
            rows.push(if current {
                RawRow::new("Spring Sale", day(d), "instagram", "video", 100.0, 10_000, 170, 200.0)
            } else {
                RawRow::new("Spring Sale", day(d), "instagram", "video", 100.0, 10_000, 250, 300.0)
            });
            rows.push(RawRow::new(
                "Flash Deal",
                day(d),
                "instagram",
                "carousel",
                50.0,
                10_000,
                if current { 60 } else { 80 },
                100.0,
            ));
            rows.push(RawRow::new("Clearance", day(d), "facebook", "carousel", 80.0, 10_000, 50, 60.0));
        }
    }
    rows
}

pub fn campaign_batch() -> RecordBatch {
    raw_batch(&campaign_rows())
}

pub fn campaign_table() -> CleanTable {
    DataValidator::default()
        .validate(&campaign_batch())
        .unwrap()
        .table
}

/// Config with zero backoff so retries do not slow real-time tests down.
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.retry.initial_retry_delay = 0.0;
    config.retry.max_retry_delay = 0.0;
    config.retry.call_timeout = 5.0;
    config
}

/// H1 holds, H2 contradicts the data, H3 has no evidence, the fourth entry
/// is malformed.
pub fn hypotheses_response() -> String {
    let body = json!({
        "hypotheses": [
            {
                "id": "H1",
                "claim_text": "Spring Sale CTR fell because the video creative fatigued",
                "target_metric": "ctr",
                "target_segment": {"kind": "campaign", "name": "Spring Sale"},
                "claimed_direction": "decrease",
                "preliminary_confidence": 0.7
            },
            {
                "id": "H2",
                "claim_text": "Spring Sale ROAS improved",
                "target_metric": "roas",
                "target_segment": {"kind": "campaign", "name": "Spring Sale"},
                "claimed_direction": "increase"
            },
            {
                "id": "H3",
                "claim_text": "TikTok spend was cut",
                "target_metric": "spend",
                "target_segment": {"kind": "platform", "name": "tiktok"},
                "claimed_direction": "decrease"
            },
            {
                "id": "H4",
                "claim_text": "something changed"
            }
        ]
    });
    format!("Here is my analysis:\n```json\n{body}\n```")
}

pub fn creative_response(campaign: &str) -> String {
    json!({
        "recommendations": [{
            "campaign_name": campaign,
            "current_issue": "CTR below 1%",
            "creative_variations": [{
                "creative_type": "video",
                "headline": "Last chance",
                "message": "Everything must go",
                "cta": "Shop now",
                "rationale": "Video leads CTR in this account"
            }],
            "linked_hypotheses": ["H1"]
        }]
    })
    .to_string()
}

/// Model answering every prompt successfully.
pub fn happy_model() -> ScriptedModel {
    ScriptedModel::new(|prompt, _call| match prompt.task {
        PromptTask::Hypotheses => Ok(hypotheses_response()),
        PromptTask::Creatives => Ok(creative_response(prompt.subject.as_deref().unwrap_or("?"))),
    })
}
