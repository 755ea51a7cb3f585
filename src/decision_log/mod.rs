//! Append-only decision log
//!
//! Every component decision in a run is appended here with its inputs, outputs
//! and reasoning, so a report can be audited after the fact. Entries are never
//! mutated or removed, and the sequence number is the causal order.
//!
//! ## Usage
//!
//! ```rust
//! use ads_evidence::decision_log::{Component, DecisionLog, DecisionLogEntry};
//!
//! let mut log = DecisionLog::new("run-001");
//! let seq = log.record(
//!     DecisionLogEntry::builder(Component::Orchestrator, "run_started")
//!         .reasoning("query received"),
//! );
//! assert_eq!(seq, 0);
//! assert_eq!(log.len(), 1);
//! ```

mod entry;

pub use entry::{Component, DecisionBuilder, DecisionLogEntry};

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered audit trail of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    run_id: String,
    entries: Vec<DecisionLogEntry>,
}

/// Counts over a decision log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLogStats {
    /// Total entries
    pub total_entries: usize,
    /// Entries per component
    pub by_component: BTreeMap<Component, usize>,
    /// Entries marked as degradations
    pub degradations: usize,
}

impl DecisionLog {
    /// Create an empty log for a run.
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            entries: Vec::new(),
        }
    }

    /// Owning run.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Append a decision and return its sequence number.
    pub fn record(&mut self, decision: DecisionBuilder) -> u64 {
        let sequence = self.entries.len() as u64;
        let entry = decision.build(sequence, &self.run_id);

        if entry.is_degradation() {
            tracing::warn!(
                run_id = %self.run_id,
                sequence = sequence,
                component = %entry.component(),
                decision = entry.decision(),
                "{}",
                entry.reasoning()
            );
        } else {
            tracing::info!(
                run_id = %self.run_id,
                sequence = sequence,
                component = %entry.component(),
                decision = entry.decision(),
                "{}",
                entry.reasoning()
            );
        }

        self.entries.push(entry);
        sequence
    }

    /// All entries in sequence order.
    #[must_use]
    pub fn entries(&self) -> &[DecisionLogEntry] {
        &self.entries
    }

    /// Entries of one component, in sequence order.
    pub fn for_component(&self, component: Component) -> impl Iterator<Item = &DecisionLogEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.component() == component)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One JSON object per line.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if an entry cannot be encoded.
    pub fn to_json_lines(&self) -> Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Entry counts.
    #[must_use]
    pub fn stats(&self) -> DecisionLogStats {
        let mut stats = DecisionLogStats {
            total_entries: self.entries.len(),
            ..DecisionLogStats::default()
        };
        for entry in &self.entries {
            *stats.by_component.entry(entry.component()).or_insert(0) += 1;
            if entry.is_degradation() {
                stats.degradations += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sequence_is_append_order() {
        let mut log = DecisionLog::new("run-1");
        for i in 0..5 {
            let seq = log.record(DecisionLogEntry::builder(
                Component::Evaluator,
                format!("decision_{i}"),
            ));
            assert_eq!(seq, i);
        }
        let sequences: Vec<u64> = log.entries().iter().map(DecisionLogEntry::sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert!(log.entries().iter().all(|e| e.run_id() == "run-1"));
    }

    #[test]
    fn test_for_component_and_stats() {
        let mut log = DecisionLog::new("run-1");
        log.record(DecisionLogEntry::builder(Component::Orchestrator, "run_started"));
        log.record(DecisionLogEntry::builder(Component::Evaluator, "hypothesis_evaluated"));
        log.record(
            DecisionLogEntry::builder(Component::HypothesisGenerator, "generation_failed").degraded(),
        );

        assert_eq!(log.for_component(Component::Evaluator).count(), 1);
        let stats = log.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.degradations, 1);
        assert_eq!(stats.by_component[&Component::Orchestrator], 1);
    }

    #[test]
    fn test_json_lines() {
        let mut log = DecisionLog::new("run-1");
        log.record(
            DecisionLogEntry::builder(Component::DataValidator, "dataset_validated")
                .outputs(json!({"quality_score": 97.5})),
        );
        log.record(DecisionLogEntry::builder(Component::Orchestrator, "run_completed"));

        let lines = log.to_json_lines().unwrap();
        let parsed: Vec<serde_json::Value> = lines
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["component"], "data_validator");
        assert_eq!(parsed[0]["outputs"]["quality_score"], 97.5);
        assert_eq!(parsed[1]["sequence"], 1);
    }
}
