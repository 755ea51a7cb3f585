//! Per-run state

use super::state::RunState;
use crate::decision_log::{Component, DecisionLog, DecisionLogEntry};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A recoverable stage failure. The run continues with reduced output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    /// Stage the failure happened in
    pub stage: RunState,
    /// Component that failed
    pub component: Component,
    /// Campaign affected, for per-campaign calls
    pub subject: Option<String>,
    /// Failure description
    pub reason: String,
}

/// Everything one run owns. Created per run, never shared between runs.
#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    state: RunState,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    log: DecisionLog,
    degradations: Vec<Degradation>,
}

impl RunContext {
    /// Create a context with a fresh UUID v7 run id.
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        let run_id = Uuid::now_v7().to_string();
        Self {
            log: DecisionLog::new(run_id.clone()),
            run_id,
            state: RunState::Idle,
            started_at: Utc::now(),
            cancel,
            degradations: Vec::new(),
        }
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Cancellation token of this run.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Decision log so far.
    #[must_use]
    pub const fn log(&self) -> &DecisionLog {
        &self.log
    }

    /// Mutable decision log, for components that append decisions.
    pub fn log_mut(&mut self) -> &mut DecisionLog {
        &mut self.log
    }

    /// Degradations so far.
    #[must_use]
    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    /// Move to `next`, recording the transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] for an illegal transition.
    pub fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        let from = self.state;
        self.state = next;
        tracing::debug!(run_id = %self.run_id, from = %from, to = %next, "run state changed");
        self.log.record(
            DecisionLogEntry::builder(Component::Orchestrator, "stage_entered")
                .reasoning(format!("{from} -> {next}"))
                .inputs(json!({ "from": from }))
                .outputs(json!({ "to": next })),
        );
        Ok(())
    }

    /// Fail with [`Error::Cancelled`] once the token has fired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the run was cancelled.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Record a degradation in the report and the decision log.
    pub fn degrade(&mut self, component: Component, subject: Option<String>, reason: impl Into<String>) {
        let degradation = Degradation {
            stage: self.state,
            component,
            subject,
            reason: reason.into(),
        };
        self.log.record(
            DecisionLogEntry::builder(component, "stage_degraded")
                .reasoning(degradation.reason.clone())
                .inputs(json!({ "stage": degradation.stage, "subject": degradation.subject }))
                .degraded(),
        );
        self.degradations.push(degradation);
    }

    pub(super) fn into_parts(self) -> (String, RunState, DateTime<Utc>, DecisionLog, Vec<Degradation>) {
        (
            self.run_id,
            self.state,
            self.started_at,
            self.log,
            self.degradations,
        )
    }
}
