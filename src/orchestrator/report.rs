//! Run reports

use super::context::Degradation;
use super::state::RunState;
use crate::comparison::{Evidence, PeriodWindows};
use crate::dataset::DatasetSummary;
use crate::decision_log::DecisionLog;
use crate::evaluation::{Evaluation, EvaluationSummary, Hypothesis, ValidationStatus};
use crate::llm::{CreativeRecommendation, RejectedHypothesis};
use crate::performers::{CampaignPerformance, CreativePerformance};
use crate::validation::QualityReport;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier (UUID v7)
    pub run_id: String,
    /// The question asked
    pub query: String,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Final state, always `done`
    pub state: RunState,
    /// Data quality, including dropped and repaired counts
    pub quality: QualityReport,
    /// Clean dataset overview
    pub dataset: DatasetSummary,
    /// Compared windows, absent for an empty dataset
    pub windows: Option<PeriodWindows>,
    /// Evidence for every segment and metric
    pub evidence: Vec<Evidence>,
    /// Hypotheses accepted from the model
    pub hypotheses: Vec<Hypothesis>,
    /// Model entries dropped as malformed or duplicate
    pub malformed_hypotheses: Vec<RejectedHypothesis>,
    /// One evaluation per accepted hypothesis, in hypothesis order
    pub evaluations: Vec<Evaluation>,
    /// Status counts and rejected hypotheses with reasons
    pub evaluation_summary: EvaluationSummary,
    /// Campaigns creatives were requested for
    pub low_ctr_campaigns: Vec<CampaignPerformance>,
    /// Reference creatives sent with creative prompts
    pub top_performers: Vec<CreativePerformance>,
    /// Creative recommendations, in campaign order
    pub creatives: Vec<CreativeRecommendation>,
    /// Recoverable failures
    pub degradations: Vec<Degradation>,
    /// Audit trail
    pub decision_log: DecisionLog,
}

impl RunReport {
    /// Whether any stage degraded.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Evaluations with the given status.
    pub fn evaluations_with(&self, status: ValidationStatus) -> impl Iterator<Item = &Evaluation> {
        self.evaluations
            .iter()
            .filter(move |e| e.validation_status() == status)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a report produced by [`to_json`](Self::to_json).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] for invalid input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Plain markdown summary.
    #[must_use]
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let q = &self.quality;
        let s = &self.evaluation_summary;

        let _ = writeln!(out, "# Run {}", self.run_id);
        let _ = writeln!(out);
        let _ = writeln!(out, "Query: {}", self.query);
        let _ = writeln!(out);
        let _ = writeln!(out, "## Data quality");
        let _ = writeln!(out, "- Quality score: {:.1}/100", q.quality_score);
        let _ = writeln!(out, "- Rows: {} raw, {} clean", q.raw_rows, q.clean_rows);
        let _ = writeln!(
            out,
            "- Dropped rows: {} ({} unparseable date, {} no metrics)",
            q.dropped_rows(),
            q.dropped_unparseable_date,
            q.dropped_empty_metrics
        );
        let _ = writeln!(
            out,
            "- Repaired rows: {} ({} cells)",
            q.repaired_rows, q.repaired_cells
        );
        let _ = writeln!(out, "- Date range: {}", self.dataset.date_range());
        if let Some(windows) = &self.windows {
            let _ = writeln!(out, "- Compared: {}", windows.label());
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "## Hypotheses");
        let _ = writeln!(
            out,
            "- {} evaluated: {} confirmed, {} partially confirmed, {} refuted, {} insufficient data",
            s.total, s.confirmed, s.partially_confirmed, s.refuted, s.insufficient_data
        );
        for evaluation in &self.evaluations {
            let _ = writeln!(
                out,
                "- {} [{} | {} | confidence {:.2}]: {}",
                evaluation.hypothesis_id(),
                evaluation.validation_status(),
                evaluation.impact(),
                evaluation.confidence(),
                evaluation.reasoning()
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "## Rejected hypotheses");
        if s.rejected.is_empty() && self.malformed_hypotheses.is_empty() {
            let _ = writeln!(out, "- none");
        }
        for rejected in &s.rejected {
            let _ = writeln!(
                out,
                "- {} ({}): {}",
                rejected.hypothesis_id, rejected.status, rejected.reason
            );
        }
        for malformed in &self.malformed_hypotheses {
            let _ = writeln!(
                out,
                "- {} (malformed): {}",
                malformed
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("#{}", malformed.index)),
                malformed.reason
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "## Creative recommendations");
        if self.creatives.is_empty() {
            let _ = writeln!(out, "- none");
        }
        for recommendation in &self.creatives {
            let _ = writeln!(
                out,
                "- {}: {} variation(s){}",
                recommendation.campaign_name,
                recommendation.creative_variations.len(),
                if recommendation.current_issue.is_empty() {
                    String::new()
                } else {
                    format!(" for \"{}\"", recommendation.current_issue)
                }
            );
        }

        if self.is_degraded() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Degradations");
            for degradation in &self.degradations {
                let _ = writeln!(
                    out,
                    "- {} / {}{}: {}",
                    degradation.stage,
                    degradation.component,
                    degradation
                        .subject
                        .as_ref()
                        .map(|s| format!(" ({s})"))
                        .unwrap_or_default(),
                    degradation.reason
                );
            }
        }

        out
    }
}

/// A run stopped by a fatal error. No evaluations are published.
#[derive(Debug, Error)]
#[error("Run {run_id} aborted during {stage}: {error}")]
pub struct RunAborted {
    /// Run identifier
    pub run_id: String,
    /// State the run was in when it failed
    pub stage: RunState,
    /// The fatal error
    #[source]
    pub error: Error,
    /// Decisions recorded up to and including the abort
    pub decision_log: DecisionLog,
}
