//! Pipeline Demo: Why did Spring Sale CTR drop?
//!
//! Builds a two-week advertising export in memory, answers a question with a
//! scripted language model, prints the report summary and archives the run.
//!
//! The scripted model stands in for a real provider: it proposes three
//! hypotheses (one true, one contradicted by the data, one about a platform
//! that does not exist) and one creative per low-CTR campaign.
//!
//! Run with: cargo run --example pipeline_demo
//! Verbose:  RUST_LOG=ads_evidence=debug cargo run --example pipeline_demo

use ads_evidence::archive::{MemoryRunArchive, RunArchive};
use ads_evidence::config::PipelineConfig;
use ads_evidence::llm::{PromptTask, ScriptedModel};
use ads_evidence::orchestrator::Orchestrator;
use ads_evidence::storage::PerformanceTable;
use ads_evidence::telemetry::{init_tracing, DEFAULT_FILTER};
use anyhow::Context;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::json;
use std::sync::Arc;

/// (campaign, platform, creative, ctr per mille baseline, current, roas baseline, current)
const CAMPAIGNS: [(&str, &str, &str, i64, i64, f64, f64); 3] = [
    ("Evergreen", "facebook", "image", 30, 30, 4.0, 4.0),
    ("Spring Sale", "instagram", "video", 25, 17, 3.0, 2.0),
    ("Flash Deal", "instagram", "carousel", 8, 6, 2.0, 2.0),
];

fn export() -> anyhow::Result<RecordBatch> {
    let mut campaign = Vec::new();
    let mut date = Vec::new();
    let mut platform = Vec::new();
    let mut creative = Vec::new();
    let mut spend = Vec::new();
    let mut impressions = Vec::new();
    let mut clicks = Vec::new();
    let mut revenue = Vec::new();

    for day in 1..=14 {
        for (name, network, format, ctr_before, ctr_after, roas_before, roas_after) in CAMPAIGNS {
            let current = day > 7;
            for _ in 0..6 {
                campaign.push(name);
                date.push(format!("2024-03-{day:02}"));
                platform.push(network);
                creative.push(format);
                spend.push(100.0);
                impressions.push(10_000_i64);
                clicks.push(10 * if current { ctr_after } else { ctr_before });
                revenue.push(100.0 * if current { roas_after } else { roas_before });
            }
        }
    }
    // One defective row to show up in the quality report
    campaign.push("Spring Sale");
    date.push("sometime in March".to_string());
    platform.push("instagram");
    creative.push("video");
    spend.push(f64::NAN);
    impressions.push(10_000);
    clicks.push(100);
    revenue.push(0.0);

    let schema = Schema::new(vec![
        Field::new("campaign_name", DataType::Utf8, false),
        Field::new("date", DataType::Utf8, false),
        Field::new("platform", DataType::Utf8, false),
        Field::new("creative_type", DataType::Utf8, false),
        Field::new("spend", DataType::Float64, false),
        Field::new("impressions", DataType::Int64, false),
        Field::new("clicks", DataType::Int64, false),
        Field::new("revenue", DataType::Float64, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(campaign)),
        Arc::new(StringArray::from(date)),
        Arc::new(StringArray::from(platform)),
        Arc::new(StringArray::from(creative)),
        Arc::new(Float64Array::from(spend)),
        Arc::new(Int64Array::from(impressions)),
        Arc::new(Int64Array::from(clicks)),
        Arc::new(Float64Array::from(revenue)),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).context("building demo export")
}

fn scripted_model() -> ScriptedModel {
    ScriptedModel::new(|prompt, _call| {
        let response = match prompt.task {
            PromptTask::Hypotheses => json!({
                "hypotheses": [
                    {
                        "id": "H1",
                        "claim_text": "Spring Sale CTR fell because the video creative fatigued",
                        "target_metric": "ctr",
                        "target_segment": {"kind": "campaign", "name": "Spring Sale"},
                        "claimed_direction": "decrease",
                        "preliminary_confidence": 0.8
                    },
                    {
                        "id": "H2",
                        "claim_text": "Evergreen CTR dropped too",
                        "target_metric": "ctr",
                        "target_segment": {"kind": "campaign", "name": "Evergreen"},
                        "claimed_direction": "decrease"
                    },
                    {
                        "id": "H3",
                        "claim_text": "TikTok spend was cut",
                        "target_metric": "spend",
                        "target_segment": {"kind": "platform", "name": "tiktok"},
                        "claimed_direction": "decrease"
                    }
                ]
            }),
            PromptTask::Creatives => json!({
                "recommendations": [{
                    "campaign_name": prompt.subject,
                    "current_issue": "CTR below 1%",
                    "creative_variations": [{
                        "creative_type": "image",
                        "headline": "48 hours only",
                        "message": "Our best prices of the season end Sunday.",
                        "cta": "Shop the sale",
                        "rationale": "Image creatives lead CTR in this account"
                    }],
                    "linked_hypotheses": ["H1"]
                }]
            }),
        };
        Ok(format!("```json\n{response}\n```"))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(DEFAULT_FILTER)?;

    println!("=== ads-evidence Pipeline Demo ===\n");

    let table = PerformanceTable::new(vec![export()?]);
    println!("Raw export: {} rows\n", table.num_rows());

    let config = PipelineConfig::from_toml_str(
        r"
[thresholds]
low_ctr_threshold = 0.01

[retry]
max_retries = 2
initial_retry_delay = 0.1
",
    )?;
    let orchestrator = Orchestrator::new(config, Arc::new(scripted_model()))?;

    let report = orchestrator
        .run(&table.combined()?, "Why did Spring Sale CTR drop last week?")
        .await?;
    println!("{}", report.render_summary());

    let stats = report.decision_log.stats();
    println!("Decision log: {} entries", stats.total_entries);
    for (component, count) in &stats.by_component {
        println!("  {component}: {count}");
    }

    let archive = MemoryRunArchive::new();
    archive.store(&report).await?;
    println!("\nArchived runs: {:?}", archive.run_ids().await?);

    Ok(())
}
