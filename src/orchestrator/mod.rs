//! Run orchestration
//!
//! One [`Orchestrator`] drives any number of independent runs. Each run gets
//! its own [`RunContext`] (run id, state, decision log, cancellation token), so
//! concurrent runs never share mutable state.
//!
//! ## Failure Handling
//!
//! | Failure | Outcome |
//! |---|---|
//! | identifier column absent | abort (`RunAborted`) |
//! | comparison error | abort |
//! | cancellation | abort |
//! | hypothesis call fails after retries | degrade, evaluate zero hypotheses |
//! | creative call fails for a campaign | degrade, keep other campaigns |
//!
//! # Example
//!
//! ```rust,no_run
//! use ads_evidence::config::PipelineConfig;
//! use ads_evidence::llm::ScriptedModel;
//! use ads_evidence::orchestrator::Orchestrator;
//! use ads_evidence::storage::PerformanceTable;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Arc::new(ScriptedModel::new(|_, _| Ok(r#"{"hypotheses": []}"#.to_string())));
//! let orchestrator = Orchestrator::new(PipelineConfig::default(), model)?;
//!
//! let table = PerformanceTable::load_parquet("data/ads.parquet")?;
//! let report = orchestrator.run(&table.combined()?, "Why did ROAS drop?").await?;
//! println!("{}", report.render_summary());
//! # Ok(())
//! # }
//! ```

mod context;
mod report;
mod state;

pub use context::{Degradation, RunContext};
pub use report::{RunAborted, RunReport};
pub use state::RunState;

use crate::comparison::{Evidence, PeriodComparator, PeriodWindows};
use crate::config::PipelineConfig;
use crate::dataset::{CleanTable, DatasetSummary};
use crate::decision_log::{Component, DecisionLogEntry};
use crate::evaluation::{Evaluation, EvaluationSummary, Evaluator};
use crate::llm::{
    parse_hypotheses, parse_recommendations, CreativeRecommendation, LanguageModel,
    ParsedHypotheses, PromptContext,
};
use crate::performers::{low_ctr_campaigns, top_performers, CampaignPerformance, CreativePerformance};
use crate::retry::{ExternalCallError, ExternalError, RetryPolicy};
use crate::validation::{DataValidator, ValidationOutcome};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Stage outputs collected while a run is in flight.
#[derive(Default)]
struct RunOutputs {
    outcome: Option<ValidationOutcome>,
    dataset: Option<DatasetSummary>,
    windows: Option<PeriodWindows>,
    evidence: Vec<Evidence>,
    parsed: ParsedHypotheses,
    evaluations: Vec<Evaluation>,
    low_ctr_campaigns: Vec<CampaignPerformance>,
    top_performers: Vec<CreativePerformance>,
    creatives: Vec<CreativeRecommendation>,
}

/// Drives runs through validation, comparison, hypothesis evaluation and
/// creative generation.
#[derive(Debug)]
pub struct Orchestrator<L> {
    config: PipelineConfig,
    model: Arc<L>,
    validator: DataValidator,
    comparator: PeriodComparator,
    evaluator: Evaluator,
    retry: RetryPolicy,
}

impl<L: LanguageModel + 'static> Orchestrator<L> {
    /// Create an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: PipelineConfig, model: Arc<L>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            validator: DataValidator::new(config.quality.clone()),
            comparator: PeriodComparator::new(config.thresholds.min_sample_size),
            evaluator: Evaluator::from_config(&config),
            retry: RetryPolicy::from_config(&config.retry),
            model,
            config,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline on a raw table.
    ///
    /// # Errors
    ///
    /// Returns [`RunAborted`] on a fatal error.
    pub async fn run(&self, batch: &RecordBatch, query: &str) -> std::result::Result<RunReport, RunAborted> {
        self.run_with_cancel(batch, query, CancellationToken::new())
            .await
    }

    /// Run the pipeline, stopping at the next checkpoint once `cancel` fires.
    ///
    /// Cancellation is observed between stages and between retry attempts.
    ///
    /// # Errors
    ///
    /// Returns [`RunAborted`] on a fatal error or cancellation.
    pub async fn run_with_cancel(
        &self,
        batch: &RecordBatch,
        query: &str,
        cancel: CancellationToken,
    ) -> std::result::Result<RunReport, RunAborted> {
        let mut ctx = RunContext::new(cancel);
        let span = tracing::info_span!("run", run_id = %ctx.run_id());

        ctx.log_mut().record(
            DecisionLogEntry::builder(Component::Orchestrator, "run_started")
                .reasoning(format!("analysing {} raw rows", batch.num_rows()))
                .inputs(json!({ "query": query, "rows": batch.num_rows() })),
        );

        let mut outputs = RunOutputs::default();
        let driven = self
            .drive(&mut ctx, batch, query, &mut outputs)
            .instrument(span)
            .await;
        match driven {
            Ok(()) => Ok(Self::finish(ctx, query, outputs)),
            Err(error) => Err(Self::abort(ctx, error)),
        }
    }

    async fn drive(
        &self,
        ctx: &mut RunContext,
        batch: &RecordBatch,
        query: &str,
        out: &mut RunOutputs,
    ) -> Result<()> {
        // Validating
        ctx.transition(RunState::Validating)?;
        ctx.ensure_active()?;
        let outcome = self.validator.validate(batch)?;
        let q = &outcome.report;
        ctx.log_mut().record(
            DecisionLogEntry::builder(Component::DataValidator, "dataset_validated")
                .reasoning(format!(
                    "kept {} of {} rows, dropped {}, repaired {}; quality score {:.1}",
                    q.clean_rows,
                    q.raw_rows,
                    q.dropped_rows(),
                    q.repaired_rows,
                    q.quality_score
                ))
                .outputs(json!({
                    "clean_rows": q.clean_rows,
                    "dropped_unparseable_date": q.dropped_unparseable_date,
                    "dropped_empty_metrics": q.dropped_empty_metrics,
                    "repaired_rows": q.repaired_rows,
                    "quality_score": q.quality_score,
                    "issues": q.issues.len(),
                })),
        );
        let dataset = DatasetSummary::from_table(&outcome.table);
        out.dataset = Some(dataset.clone());
        let table = out.outcome.insert(outcome).table.clone();

        // ComparingPeriods
        ctx.transition(RunState::ComparingPeriods)?;
        ctx.ensure_active()?;
        let window_days = self.config.comparison.baseline_window_days;
        out.windows = PeriodComparator::windows(&table, window_days)?;
        out.evidence = match &out.windows {
            Some(windows) => self.comparator.compare_windows(&table, windows),
            None => Vec::new(),
        };
        let insufficient = out.evidence.iter().filter(|e| e.insufficient_sample).count();
        ctx.log_mut().record(
            DecisionLogEntry::builder(Component::PeriodComparator, "evidence_derived")
                .reasoning(match &out.windows {
                    Some(windows) => format!(
                        "{} evidence rows ({insufficient} below minimum sample) for {}",
                        out.evidence.len(),
                        windows.label()
                    ),
                    None => "no records, no evidence".to_string(),
                })
                .inputs(json!({ "window_days": window_days }))
                .outputs(json!({
                    "windows": out.windows,
                    "evidence": out.evidence.len(),
                    "insufficient_sample": insufficient,
                })),
        );

        // AwaitingHypotheses
        ctx.transition(RunState::AwaitingHypotheses)?;
        ctx.ensure_active()?;
        out.parsed = self.request_hypotheses(ctx, query, &dataset, &out.evidence).await?;

        // Evaluating
        ctx.transition(RunState::Evaluating)?;
        ctx.ensure_active()?;
        out.evaluations = self
            .evaluator
            .evaluate(&out.parsed.hypotheses, &out.evidence, ctx.log_mut());
        let summary = EvaluationSummary::from_evaluations(&out.evaluations);
        ctx.log_mut().record(
            DecisionLogEntry::builder(Component::Evaluator, "evaluation_completed")
                .reasoning(format!(
                    "{} confirmed, {} partially confirmed, {} refuted, {} insufficient data",
                    summary.confirmed,
                    summary.partially_confirmed,
                    summary.refuted,
                    summary.insufficient_data
                ))
                .outputs(json!(summary)),
        );

        // AwaitingCreatives
        ctx.transition(RunState::AwaitingCreatives)?;
        ctx.ensure_active()?;
        if let Some(windows) = out.windows {
            let creatives = &self.config.creatives;
            let thresholds = &self.config.thresholds;
            out.low_ctr_campaigns = low_ctr_campaigns(
                &table,
                &windows.current,
                thresholds.low_ctr_threshold,
                creatives.max_campaigns,
            );
            out.top_performers = top_performers(
                &table,
                thresholds.low_ctr_threshold,
                thresholds.low_roas_threshold,
                creatives.max_top_performers,
            );
        }
        out.creatives = self
            .request_creatives(ctx, query, &out.low_ctr_campaigns, &out.top_performers, &out.evaluations)
            .await?;

        ctx.transition(RunState::Done)?;
        Ok(())
    }

    async fn request_hypotheses(
        &self,
        ctx: &mut RunContext,
        query: &str,
        dataset: &DatasetSummary,
        evidence: &[Evidence],
    ) -> Result<ParsedHypotheses> {
        let prompt = PromptContext::for_hypotheses(query, dataset, evidence);
        let model: &L = &self.model;
        let prompt_ref = &prompt;

        let result = self
            .retry
            .execute_with_cancel(
                move |_attempt| async move {
                    let text = model.generate(prompt_ref).await?;
                    parse_hypotheses(&text).map_err(ExternalError::from)
                },
                ctx.cancel_token(),
            )
            .await;

        match result {
            Ok(parsed) => {
                ctx.log_mut().record(
                    DecisionLogEntry::builder(Component::HypothesisGenerator, "hypotheses_received")
                        .reasoning(format!(
                            "{} hypotheses accepted, {} rejected as malformed",
                            parsed.hypotheses.len(),
                            parsed.rejected.len()
                        ))
                        .outputs(json!({
                            "accepted": parsed.hypotheses.iter().map(|h| &h.id).collect::<Vec<_>>(),
                            "rejected": parsed.rejected,
                        })),
                );
                Ok(parsed)
            }
            Err(err) => {
                self.record_retry_outcome(ctx, &err, None);
                let error = Error::from(err);
                if error.is_fatal() {
                    return Err(error);
                }
                ctx.degrade(
                    Component::HypothesisGenerator,
                    None,
                    format!("hypothesis generation failed, evaluating zero hypotheses: {error}"),
                );
                Ok(ParsedHypotheses::default())
            }
        }
    }

    async fn request_creatives(
        &self,
        ctx: &mut RunContext,
        query: &str,
        campaigns: &[CampaignPerformance],
        top: &[CreativePerformance],
        evaluations: &[Evaluation],
    ) -> Result<Vec<CreativeRecommendation>> {
        if campaigns.is_empty() {
            ctx.log_mut().record(
                DecisionLogEntry::builder(Component::CreativeGenerator, "creatives_skipped")
                    .reasoning(format!(
                        "no campaign below CTR {:.4} in the current window",
                        self.config.thresholds.low_ctr_threshold
                    )),
            );
            return Ok(Vec::new());
        }

        let supporting: Vec<Evaluation> = evaluations
            .iter()
            .filter(|e| !e.validation_status().is_rejected())
            .cloned()
            .collect();

        let mut tasks = JoinSet::new();
        for (index, campaign) in campaigns.iter().enumerate() {
            let model = Arc::clone(&self.model);
            let retry = self.retry.clone();
            let cancel = ctx.cancel_token().clone();
            let prompt = PromptContext::for_creatives(query, campaign, top, &supporting);
            let campaign_name = campaign.campaign_name.clone();

            tasks.spawn(async move {
                let model: &L = &model;
                let prompt_ref = &prompt;
                let result = retry
                    .execute_with_cancel(
                        move |_attempt| async move {
                            let text = model.generate(prompt_ref).await?;
                            parse_recommendations(&text).map_err(ExternalError::from)
                        },
                        &cancel,
                    )
                    .await;
                (index, campaign_name, result)
            });
        }

        let mut results = Vec::with_capacity(campaigns.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(join_error) => ctx.degrade(
                    Component::CreativeGenerator,
                    None,
                    format!("creative task failed: {join_error}"),
                ),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut creatives = Vec::new();
        let mut cancelled = false;
        for (_, campaign_name, result) in results {
            match result {
                Ok(recommendations) => {
                    ctx.log_mut().record(
                        DecisionLogEntry::builder(Component::CreativeGenerator, "creatives_received")
                            .reasoning(format!(
                                "{} recommendation(s) for '{campaign_name}'",
                                recommendations.len()
                            ))
                            .inputs(json!({ "campaign": campaign_name }))
                            .outputs(json!({
                                "variations": recommendations
                                    .iter()
                                    .map(|r| r.creative_variations.len())
                                    .sum::<usize>(),
                            })),
                    );
                    creatives.extend(recommendations);
                }
                Err(err) if err.is_cancelled() => cancelled = true,
                Err(err) => {
                    self.record_retry_outcome(ctx, &err, Some(&campaign_name));
                    ctx.degrade(
                        Component::CreativeGenerator,
                        Some(campaign_name),
                        format!("creative generation failed: {err}"),
                    );
                }
            }
        }

        if cancelled {
            return Err(Error::Cancelled);
        }
        Ok(creatives)
    }

    fn record_retry_outcome(&self, ctx: &mut RunContext, err: &ExternalCallError, subject: Option<&str>) {
        ctx.log_mut().record(
            DecisionLogEntry::builder(Component::RetryPolicy, "retries_stopped")
                .reasoning(format!(
                    "{} attempt(s) of at most {}: {err}",
                    err.attempts(),
                    self.retry.max_attempts()
                ))
                .inputs(json!({ "subject": subject }))
                .outputs(json!({
                    "attempts": err.attempts(),
                    "last_error": err.last_error(),
                    "cancelled": err.is_cancelled(),
                })),
        );
    }

    fn finish(ctx: RunContext, query: &str, out: RunOutputs) -> RunReport {
        let (run_id, state, started_at, mut log, degradations) = ctx.into_parts();
        let evaluation_summary = EvaluationSummary::from_evaluations(&out.evaluations);
        let quality = out.outcome.map(|o| o.report).unwrap_or_default();

        log.record(
            DecisionLogEntry::builder(Component::Orchestrator, "run_completed")
                .reasoning(format!(
                    "{} evaluation(s), {} creative recommendation(s), {} degradation(s)",
                    out.evaluations.len(),
                    out.creatives.len(),
                    degradations.len()
                ))
                .outputs(json!({
                    "evaluations": out.evaluations.len(),
                    "creatives": out.creatives.len(),
                    "degradations": degradations.len(),
                })),
        );

        RunReport {
            run_id,
            query: query.to_string(),
            started_at,
            finished_at: Utc::now(),
            state,
            quality,
            dataset: out
                .dataset
                .unwrap_or_else(|| DatasetSummary::from_table(&CleanTable::default())),
            windows: out.windows,
            evidence: out.evidence,
            hypotheses: out.parsed.hypotheses,
            malformed_hypotheses: out.parsed.rejected,
            evaluations: out.evaluations,
            evaluation_summary,
            low_ctr_campaigns: out.low_ctr_campaigns,
            top_performers: out.top_performers,
            creatives: out.creatives,
            degradations,
            decision_log: log,
        }
    }

    fn abort(mut ctx: RunContext, error: Error) -> RunAborted {
        let stage = ctx.state();
        tracing::error!(run_id = %ctx.run_id(), stage = %stage, error = %error, "run aborted");
        ctx.log_mut().record(
            DecisionLogEntry::builder(Component::Orchestrator, "run_aborted")
                .reasoning(format!("fatal error during {stage}: {error}"))
                .outputs(json!({ "stage": stage })),
        );
        if ctx.transition(RunState::Aborted).is_err() {
            tracing::warn!(stage = %stage, "abort requested from a terminal state");
        }
        let (run_id, _, _, decision_log, _) = ctx.into_parts();
        RunAborted {
            run_id,
            stage,
            error,
            decision_log,
        }
    }
}
