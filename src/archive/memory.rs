//! In-memory run archive using `DashMap`.
//!
//! Reports are held as encoded JSON, so a stored report is a snapshot that
//! later changes to the caller's copy cannot affect.

use super::RunArchive;
use crate::orchestrator::RunReport;
use crate::Result;
use dashmap::DashMap;

/// In-memory archive on a concurrent hashmap.
///
/// Safe to share between concurrent runs behind an `Arc`.
#[derive(Debug)]
pub struct MemoryRunArchive {
    reports: DashMap<String, Vec<u8>>,
}

impl MemoryRunArchive {
    /// Create an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: DashMap::new(),
        }
    }

    /// Number of stored reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether the archive is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl Default for MemoryRunArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl RunArchive for MemoryRunArchive {
    async fn store(&self, report: &RunReport) -> Result<()> {
        let encoded = serde_json::to_vec(report)?;
        tracing::debug!(run_id = %report.run_id, bytes = encoded.len(), "run report archived");
        self.reports.insert(report.run_id.clone(), encoded);
        Ok(())
    }

    async fn get(&self, run_id: &str) -> Result<Option<RunReport>> {
        let Some(encoded) = self.reports.get(run_id).map(|v| v.value().clone()) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&encoded)?))
    }

    async fn delete(&self, run_id: &str) -> Result<()> {
        self.reports.remove(run_id);
        Ok(())
    }

    async fn exists(&self, run_id: &str) -> Result<bool> {
        Ok(self.reports.contains_key(run_id))
    }

    async fn run_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.reports.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{Metric, Segment};
    use crate::dataset::{CleanTable, DatasetSummary};
    use crate::decision_log::{Component, DecisionLog, DecisionLogEntry};
    use crate::evaluation::{Direction, EvaluationSummary, Hypothesis};
    use crate::orchestrator::RunState;
    use crate::validation::QualityReport;
    use chrono::Utc;
    use std::sync::Arc;

    fn report(run_id: &str) -> RunReport {
        let mut log = DecisionLog::new(run_id);
        log.record(DecisionLogEntry::builder(Component::Orchestrator, "run_started"));
        RunReport {
            run_id: run_id.to_string(),
            query: "q".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            state: RunState::Done,
            quality: QualityReport::default(),
            dataset: DatasetSummary::from_table(&CleanTable::default()),
            windows: None,
            evidence: Vec::new(),
            hypotheses: vec![Hypothesis::new(
                "H1",
                "ctr fell",
                Metric::Ctr,
                Segment::Overall,
                Direction::Decrease,
            )],
            malformed_hypotheses: Vec::new(),
            evaluations: Vec::new(),
            evaluation_summary: EvaluationSummary::default(),
            low_ctr_campaigns: Vec::new(),
            top_performers: Vec::new(),
            creatives: Vec::new(),
            degradations: Vec::new(),
            decision_log: log,
        }
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let archive = MemoryRunArchive::new();
        let original = report("run-a");

        archive.store(&original).await.unwrap();
        let loaded = archive.get("run-a").await.unwrap();

        assert_eq!(loaded, Some(original));
        assert_eq!(archive.len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let archive = MemoryRunArchive::new();
        assert_eq!(archive.get("missing").await.unwrap(), None);
        assert_eq!(archive.decision_log("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let archive = MemoryRunArchive::new();
        archive.store(&report("run-a")).await.unwrap();
        assert!(archive.exists("run-a").await.unwrap());

        archive.delete("run-a").await.unwrap();
        assert!(!archive.exists("run-a").await.unwrap());
        archive.delete("run-a").await.unwrap();
        assert!(archive.is_empty());
    }

    #[tokio::test]
    async fn test_decision_log_by_run_id() {
        let archive = MemoryRunArchive::new();
        archive.store(&report("run-a")).await.unwrap();

        let log = archive.decision_log("run-a").await.unwrap().unwrap();
        assert_eq!(log.run_id(), "run-a");
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stores() {
        let archive = Arc::new(MemoryRunArchive::new());
        let mut handles = vec![];

        for i in 0..50 {
            let archive = Arc::clone(&archive);
            handles.push(tokio::spawn(async move {
                archive.store(&report(&format!("run-{i:02}"))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let ids = archive.run_ids().await.unwrap();
        assert_eq!(ids.len(), 50);
        assert_eq!(ids[0], "run-00");
        assert_eq!(ids[49], "run-49");
    }
}
