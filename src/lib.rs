//! # ads-evidence: Evidence Validation & Decision Pipeline
//!
//! **Version**: 0.1.0
//!
//! Advertising performance analysis where a language model proposes
//! hypotheses ("CTR fell on Instagram because of creative fatigue") and this
//! crate decides, from the data alone, which of them hold.
//!
//! ## Pipeline
//!
//! ```text
//! raw Arrow table
//!   -> validation      repair, drop, quality score
//!   -> comparison      baseline vs current evidence per segment and metric
//!   -> llm             hypotheses (untrusted JSON, strictly parsed)
//!   -> evaluation      confirmed / partially confirmed / refuted / insufficient data
//!   -> performers      low-CTR campaigns and top creatives
//!   -> llm             creative recommendations per campaign
//!   -> RunReport + DecisionLog
//! ```
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Bad data is repaired and counted, never silently passed on
//! - **Poka-Yoke safety**: Model output is parsed strictly and never trusted
//! - **Genchi Genbutsu**: Every verdict cites the evidence row it was scored on
//! - **Kaizen**: The decision log keeps every decision auditable after the run
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ads_evidence::config::PipelineConfig;
//! use ads_evidence::llm::ScriptedModel;
//! use ads_evidence::orchestrator::Orchestrator;
//! use ads_evidence::storage::PerformanceTable;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = PerformanceTable::load_parquet("data/ads.parquet")?;
//! let model = Arc::new(ScriptedModel::new(|_, _| Ok(r#"{"hypotheses": []}"#.to_string())));
//! let orchestrator = Orchestrator::new(PipelineConfig::load("pipeline.toml")?, model)?;
//!
//! let report = orchestrator.run(&table.combined()?, "Why did ROAS drop last week?").await?;
//! println!("{}", report.render_summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod archive;
pub mod comparison;
pub mod config;
pub mod dataset;
pub mod decision_log;
pub mod error;
pub mod evaluation;
pub mod llm;
pub mod orchestrator;
pub mod performers;
pub mod retry;
pub mod storage;
pub mod telemetry;
pub mod validation;

pub use error::{Error, Result};
