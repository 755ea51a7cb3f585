//! Language-model boundary
//!
//! The model is an opaque async function from a [`PromptContext`] to text.
//! Everything it returns goes through the strict parsers in this module before
//! the pipeline acts on it.
//!
//! # Example
//!
//! ```rust
//! use ads_evidence::llm::{LanguageModel, PromptContext, ScriptedModel};
//!
//! # async fn example() {
//! let model = ScriptedModel::new(|_prompt, _call| Ok(r#"{"hypotheses": []}"#.to_string()));
//! let prompt = PromptContext::new(ads_evidence::llm::PromptTask::Hypotheses, "why?", serde_json::Value::Null);
//! let text = model.generate(&prompt).await.unwrap();
//! assert!(ads_evidence::llm::parse_hypotheses(&text).unwrap().hypotheses.is_empty());
//! # }
//! ```

mod creative;
mod parse;

pub use creative::{parse_recommendations, CreativeRecommendation, CreativeVariation};
pub use parse::{
    extract_json, parse_hypotheses, parse_object, ParseError, ParsedHypotheses,
    RejectedHypothesis,
};

use crate::comparison::Evidence;
use crate::dataset::DatasetSummary;
use crate::evaluation::Evaluation;
use crate::performers::{CampaignPerformance, CreativePerformance};
use crate::retry::ExternalError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Mutex;

/// What a prompt asks the model to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTask {
    /// `{"hypotheses": [...]}`
    Hypotheses,
    /// `{"recommendations": [...]}`
    Creatives,
}

/// Structured input for one model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    /// Requested output
    pub task: PromptTask,
    /// The user's question
    pub query: String,
    /// Campaign the prompt is about, for per-campaign tasks
    pub subject: Option<String>,
    /// Task data (summary, evidence, performers)
    pub payload: Value,
}

impl PromptContext {
    /// Create a prompt with an arbitrary payload.
    pub fn new(task: PromptTask, query: impl Into<String>, payload: Value) -> Self {
        Self {
            task,
            query: query.into(),
            subject: None,
            payload,
        }
    }

    /// Hypothesis prompt: dataset summary plus the evidence table.
    pub fn for_hypotheses(
        query: impl Into<String>,
        summary: &DatasetSummary,
        evidence: &[Evidence],
    ) -> Self {
        Self::new(
            PromptTask::Hypotheses,
            query,
            json!({
                "summary": summary,
                "evidence": evidence,
            }),
        )
    }

    /// Creative prompt for one low-CTR campaign.
    pub fn for_creatives(
        query: impl Into<String>,
        campaign: &CampaignPerformance,
        top_performers: &[CreativePerformance],
        supporting: &[Evaluation],
    ) -> Self {
        let mut prompt = Self::new(
            PromptTask::Creatives,
            query,
            json!({
                "campaign": campaign,
                "top_performers": top_performers,
                "validated_hypotheses": supporting,
            }),
        );
        prompt.subject = Some(campaign.campaign_name.clone());
        prompt
    }
}

/// Text-generation backend.
///
/// Implementations classify their own failures with
/// [`FailureKind`](crate::retry::FailureKind) so the retry policy can decide
/// whether another attempt is worthwhile.
pub trait LanguageModel: Send + Sync {
    /// Generate a response for a prompt.
    fn generate(
        &self,
        prompt: &PromptContext,
    ) -> impl Future<Output = Result<String, ExternalError>> + Send;
}

type Responder = dyn Fn(&PromptContext, usize) -> Result<String, ExternalError> + Send + Sync;

/// Deterministic model driven by a closure, for tests, demos and benches.
///
/// The closure receives the prompt and the zero-based call index for that
/// prompt's task. Every prompt is recorded.
pub struct ScriptedModel {
    responder: Box<Responder>,
    prompts: Mutex<Vec<PromptContext>>,
}

impl ScriptedModel {
    /// Create a model answering with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&PromptContext, usize) -> Result<String, ExternalError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<PromptContext> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    /// Calls received for one task.
    #[must_use]
    pub fn calls(&self, task: PromptTask) -> usize {
        self.prompts
            .lock()
            .map(|prompts| prompts.iter().filter(|p| p.task == task).count())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("calls", &self.prompts().len())
            .finish_non_exhaustive()
    }
}

impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &PromptContext) -> Result<String, ExternalError> {
        let call = match self.prompts.lock() {
            Ok(mut prompts) => {
                let call = prompts.iter().filter(|p| p.task == prompt.task).count();
                prompts.push(prompt.clone());
                call
            }
            Err(_) => {
                return Err(ExternalError::new(
                    crate::retry::FailureKind::Other,
                    "scripted model state poisoned",
                ))
            }
        };
        (self.responder)(prompt, call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::FailureKind;

    #[tokio::test]
    async fn test_scripted_model_counts_calls_per_task() {
        let model = ScriptedModel::new(|prompt, call| match prompt.task {
            PromptTask::Hypotheses if call == 0 => Err(ExternalError::server("busy")),
            PromptTask::Hypotheses => Ok(format!("hypotheses #{call}")),
            PromptTask::Creatives => Ok(prompt.subject.clone().unwrap_or_default()),
        });

        let hyp = PromptContext::new(PromptTask::Hypotheses, "q", Value::Null);
        let err = model.generate(&hyp).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::ServerError);
        assert_eq!(model.generate(&hyp).await.unwrap(), "hypotheses #1");

        let campaign = CampaignPerformance {
            campaign_name: "Spring".to_string(),
            rows: 3,
            mean_ctr: 0.004,
            mean_roas: 0.8,
            spend: 120.0,
            impressions: 3000,
        };
        let creative = PromptContext::for_creatives("q", &campaign, &[], &[]);
        assert_eq!(model.generate(&creative).await.unwrap(), "Spring");

        assert_eq!(model.calls(PromptTask::Hypotheses), 2);
        assert_eq!(model.calls(PromptTask::Creatives), 1);
    }

    #[test]
    fn test_hypothesis_prompt_payload() {
        let summary = DatasetSummary::from_table(&crate::dataset::CleanTable::default());
        let prompt = PromptContext::for_hypotheses("Why did ROAS drop?", &summary, &[]);
        assert_eq!(prompt.task, PromptTask::Hypotheses);
        assert_eq!(prompt.payload["summary"]["total_records"], 0);
        assert!(prompt.payload["evidence"].as_array().unwrap().is_empty());
    }
}
