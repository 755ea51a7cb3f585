//! Run archive
//!
//! Finished run reports keyed by run id, with async access so a persistent
//! backend can slot in behind the same trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use ads_evidence::archive::{MemoryRunArchive, RunArchive};
//! use ads_evidence::orchestrator::RunReport;
//!
//! # async fn example(report: RunReport) -> ads_evidence::Result<()> {
//! let archive = MemoryRunArchive::new();
//! archive.store(&report).await?;
//! assert!(archive.exists(&report.run_id).await?);
//! let log = archive.decision_log(&report.run_id).await?;
//! assert!(log.is_some());
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryRunArchive;

use crate::decision_log::DecisionLog;
use crate::orchestrator::RunReport;
use crate::Result;
use std::future::Future;

/// Storage for finished run reports.
pub trait RunArchive: Send + Sync {
    /// Store a report under its run id, replacing any previous one.
    fn store(&self, report: &RunReport) -> impl Future<Output = Result<()>> + Send;

    /// Fetch a report.
    ///
    /// Returns `None` if the run id is unknown.
    fn get(&self, run_id: &str) -> impl Future<Output = Result<Option<RunReport>>> + Send;

    /// Remove a report. No-op for unknown ids.
    fn delete(&self, run_id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check if a report exists.
    fn exists(&self, run_id: &str) -> impl Future<Output = Result<bool>> + Send;

    /// All stored run ids, oldest first (UUID v7 ids sort by creation time).
    fn run_ids(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Decision log of a stored run.
    fn decision_log(
        &self,
        run_id: &str,
    ) -> impl Future<Output = Result<Option<DecisionLog>>> + Send {
        async move { Ok(self.get(run_id).await?.map(|report| report.decision_log)) }
    }
}
