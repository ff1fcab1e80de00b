use super::states::EvaluatorState;
use std::fmt;
use tracing::{debug, warn};

/// Holds the lifecycle state of a single evaluator
///
/// A plain state cell: ordering rules are enforced by the evaluator manager. The only rule
/// enforced here is that terminal states never change.
#[derive(Debug, Default)]
pub struct EvaluatorStatusManager {
    evaluator_id: String,
    state: EvaluatorState,
}

impl EvaluatorStatusManager {
    pub fn new(evaluator_id: impl Into<String>) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            state: EvaluatorState::Allocated,
        }
    }

    pub fn state(&self) -> EvaluatorState {
        self.state
    }

    pub fn is_allocated(&self) -> bool {
        self.state == EvaluatorState::Allocated
    }

    pub fn is_submitted(&self) -> bool {
        self.state == EvaluatorState::Submitted
    }

    pub fn is_running(&self) -> bool {
        self.state == EvaluatorState::Running
    }

    pub fn is_failed(&self) -> bool {
        self.state == EvaluatorState::Failed
    }

    pub fn is_done_or_failed_or_killed(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_allocated_or_submitted_or_running(&self) -> bool {
        self.state.is_active()
    }

    pub fn set_submitted(&mut self) {
        self.set_state(EvaluatorState::Submitted);
    }

    pub fn set_running(&mut self) {
        self.set_state(EvaluatorState::Running);
    }

    pub fn set_done(&mut self) {
        self.set_state(EvaluatorState::Done);
    }

    pub fn set_failed(&mut self) {
        self.set_state(EvaluatorState::Failed);
    }

    pub fn set_killed(&mut self) {
        self.set_state(EvaluatorState::Killed);
    }

    fn set_state(&mut self, target: EvaluatorState) {
        if self.state.is_terminal() {
            if self.state != target {
                warn!(
                    evaluator_id = %self.evaluator_id,
                    state = %self.state,
                    requested = %target,
                    "Ignoring transition out of terminal state"
                );
            }
            return;
        }
        debug!(
            evaluator_id = %self.evaluator_id,
            from = %self.state,
            to = %target,
            "Evaluator state transition"
        );
        self.state = target;
    }
}

impl fmt::Display for EvaluatorStatusManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)
    }
}
