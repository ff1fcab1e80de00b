// State machine module for evaluator lifecycle management
//
// Holds the state enums shared across the crate and the per-evaluator state cell.

pub mod evaluator_status;
pub mod states;

// Re-export main types for convenient access
pub use evaluator_status::EvaluatorStatusManager;
pub use states::{EvaluatorState, ReportedState, RestartState};
