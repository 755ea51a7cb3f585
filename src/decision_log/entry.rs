//! Decision log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Pipeline component that made a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Run lifecycle and stage transitions
    Orchestrator,
    /// Dataset repair
    DataValidator,
    /// Evidence derivation
    PeriodComparator,
    /// Hypothesis requests to the model
    HypothesisGenerator,
    /// Hypothesis scoring
    Evaluator,
    /// Creative requests to the model
    CreativeGenerator,
    /// Retry outcomes of external calls
    RetryPolicy,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Orchestrator => "orchestrator",
            Self::DataValidator => "data_validator",
            Self::PeriodComparator => "period_comparator",
            Self::HypothesisGenerator => "hypothesis_generator",
            Self::Evaluator => "evaluator",
            Self::CreativeGenerator => "creative_generator",
            Self::RetryPolicy => "retry_policy",
        };
        f.write_str(name)
    }
}

/// One immutable audit record.
///
/// `sequence` is the causal order within a run: an entry can only depend on
/// entries with a smaller sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    sequence: u64,
    timestamp: DateTime<Utc>,
    run_id: String,
    component: Component,
    decision: String,
    reasoning: String,
    inputs: Value,
    outputs: Value,
    #[serde(default)]
    degraded: bool,
}

impl DecisionLogEntry {
    /// Start describing a decision.
    #[must_use]
    pub fn builder(component: Component, decision: impl Into<String>) -> DecisionBuilder {
        DecisionBuilder::new(component, decision)
    }

    /// Position in the run's causal order (0-based).
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Wall-clock time of the append.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Owning run.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Deciding component.
    #[must_use]
    pub const fn component(&self) -> Component {
        self.component
    }

    /// Short decision name, e.g. `hypothesis_evaluated`.
    #[must_use]
    pub fn decision(&self) -> &str {
        &self.decision
    }

    /// Why the decision was made.
    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Inputs the decision was based on.
    #[must_use]
    pub const fn inputs(&self) -> &Value {
        &self.inputs
    }

    /// Decision outputs.
    #[must_use]
    pub const fn outputs(&self) -> &Value {
        &self.outputs
    }

    /// Whether this entry records a degradation of the run.
    #[must_use]
    pub const fn is_degradation(&self) -> bool {
        self.degraded
    }
}

/// Builder for a [`DecisionLogEntry`]; the log assigns sequence, run id and time.
#[derive(Debug, Clone)]
pub struct DecisionBuilder {
    component: Component,
    decision: String,
    reasoning: String,
    inputs: Value,
    outputs: Value,
    degraded: bool,
}

impl DecisionBuilder {
    /// Create a builder with the required fields.
    #[must_use]
    pub fn new(component: Component, decision: impl Into<String>) -> Self {
        Self {
            component,
            decision: decision.into(),
            reasoning: String::new(),
            inputs: Value::Null,
            outputs: Value::Null,
            degraded: false,
        }
    }

    /// Set the reasoning.
    #[must_use]
    pub fn reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Set the inputs.
    #[must_use]
    pub fn inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the outputs.
    #[must_use]
    pub fn outputs(mut self, outputs: Value) -> Self {
        self.outputs = outputs;
        self
    }

    /// Mark the entry as a degradation.
    #[must_use]
    pub const fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    pub(super) fn build(self, sequence: u64, run_id: &str) -> DecisionLogEntry {
        DecisionLogEntry {
            sequence,
            timestamp: Utc::now(),
            run_id: run_id.to_string(),
            component: self.component,
            decision: self.decision,
            reasoning: self.reasoning,
            inputs: self.inputs,
            outputs: self.outputs,
            degraded: self.degraded,
        }
    }
}
