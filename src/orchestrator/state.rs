//! Run state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one run.
///
/// ```text
/// Idle -> Validating -> ComparingPeriods -> AwaitingHypotheses
///      -> Evaluating -> AwaitingCreatives -> Done
///
/// any non-terminal state -> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Created, nothing done yet
    Idle,
    /// Repairing the raw table
    Validating,
    /// Deriving evidence
    ComparingPeriods,
    /// Waiting for the model's hypotheses
    AwaitingHypotheses,
    /// Scoring hypotheses
    Evaluating,
    /// Waiting for creative recommendations
    AwaitingCreatives,
    /// Finished, report published
    Done,
    /// Stopped by a fatal error or cancellation
    Aborted,
}

impl RunState {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// The next state on the happy path.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Validating),
            Self::Validating => Some(Self::ComparingPeriods),
            Self::ComparingPeriods => Some(Self::AwaitingHypotheses),
            Self::AwaitingHypotheses => Some(Self::Evaluating),
            Self::Evaluating => Some(Self::AwaitingCreatives),
            Self::AwaitingCreatives => Some(Self::Done),
            Self::Done | Self::Aborted => None,
        }
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Aborted || self.successor() == Some(next)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::ComparingPeriods => "comparing_periods",
            Self::AwaitingHypotheses => "awaiting_hypotheses",
            Self::Evaluating => "evaluating",
            Self::AwaitingCreatives => "awaiting_creatives",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RunState; 8] = [
        RunState::Idle,
        RunState::Validating,
        RunState::ComparingPeriods,
        RunState::AwaitingHypotheses,
        RunState::Evaluating,
        RunState::AwaitingCreatives,
        RunState::Done,
        RunState::Aborted,
    ];

    #[test]
    fn test_happy_path_is_legal() {
        let mut state = RunState::Idle;
        let mut steps = 0;
        while let Some(next) = state.successor() {
            assert!(state.can_transition_to(next));
            state = next;
            steps += 1;
        }
        assert_eq!(state, RunState::Done);
        assert_eq!(steps, 6);
    }

    #[test]
    fn test_abort_from_any_non_terminal() {
        for state in ALL {
            assert_eq!(
                state.can_transition_to(RunState::Aborted),
                !state.is_terminal(),
                "{state}"
            );
        }
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!RunState::Idle.can_transition_to(RunState::Evaluating));
        assert!(!RunState::Evaluating.can_transition_to(RunState::Validating));
        assert!(!RunState::Done.can_transition_to(RunState::Idle));
        assert!(!RunState::Aborted.can_transition_to(RunState::Validating));
    }
}
