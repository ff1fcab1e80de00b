//! Events exchanged with the cluster resource manager.

use crate::evaluator::EvaluatorProcess;
use crate::state_machine::ReportedState;
use serde::{Deserialize, Serialize};

/// Request to launch an evaluator process in an allocated container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLaunchEvent {
    pub evaluator_id: String,

    /// Transport address evaluators use to reach the driver
    pub driver_remote_id: String,

    pub process: EvaluatorProcess,

    /// Configuration of the root context
    pub context_configuration: String,

    /// Task to start in the root context right away
    #[serde(default)]
    pub task_configuration: Option<String>,
}

/// Request to return a container to the resource manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReleaseEvent {
    pub evaluator_id: String,
}

/// The resource manager's view of a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatusEvent {
    pub evaluator_id: String,
    pub state: ReportedState,

    #[serde(default)]
    pub diagnostics: Option<String>,

    #[serde(default)]
    pub exit_code: Option<i32>,
}

impl ResourceStatusEvent {
    pub fn new(evaluator_id: impl Into<String>, state: ReportedState) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            state,
            diagnostics: None,
            exit_code: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = Some(diagnostics.into());
        self
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }
}
