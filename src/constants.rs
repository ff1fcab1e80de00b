//! # System Constants
//!
//! Event names, default timings and the fixed messages used when the driver has to
//! synthesize a failure on behalf of an evaluator.

use std::time::Duration;

/// Lifecycle event names published for every delivered dispatcher event
pub mod events {
    // Evaluator lifecycle events
    pub const EVALUATOR_ALLOCATED: &str = "evaluator.allocated";
    pub const EVALUATOR_COMPLETED: &str = "evaluator.completed";
    pub const EVALUATOR_FAILED: &str = "evaluator.failed";
    pub const EVALUATOR_RESTART_FAILED: &str = "evaluator.driver_restart_failed";

    // Context lifecycle events
    pub const CONTEXT_ACTIVE: &str = "context.active";
    pub const CONTEXT_CLOSED: &str = "context.closed";
    pub const CONTEXT_FAILED: &str = "context.failed";
    pub const CONTEXT_MESSAGE: &str = "context.message";

    // Task lifecycle events
    pub const TASK_RUNNING: &str = "task.running";
    pub const TASK_RESTART_RUNNING: &str = "task.driver_restart_running";
    pub const TASK_SUSPENDED: &str = "task.suspended";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const TASK_FAILED: &str = "task.failed";
    pub const TASK_MESSAGE: &str = "task.message";
}

/// Messages used when the driver synthesizes failures
pub mod messages {
    /// Evaluator reported FAILED without any payload
    pub const NO_EXCEPTION_SENT: &str = "Evaluator reported a failure but no exception was sent";

    /// Evaluator reported FAILED with a payload the codec could not decode
    pub const UNDECODABLE_EXCEPTION: &str =
        "Evaluator sent an exception payload that could not be decoded";

    /// Cause attached to a task that was running when its evaluator died
    pub const EVALUATOR_CRASH: &str = "Evaluator crash";

    /// Message of a task failure whose payload was missing or undecodable
    pub const TASK_FAILURE_NO_MESSAGE: &str = "No message given";

    /// Message of contexts torn down with their evaluator
    pub const CONTEXT_EVALUATOR_FAILURE: &str = "Evaluator failure";

    /// Resource manager lost a submitted evaluator
    pub const FAILED_BEFORE_LINK: &str = " The evaluator most likely failed before establishing \
        a communications link to the driver.";

    /// Resource manager lost an evaluator that was never launched
    pub const FAILED_BEFORE_USE: &str = " The evaluator most likely failed before being used.";

    /// Resource manager lost a running evaluator that never reported its failure
    pub const FAILED_WITHOUT_REPORT: &str =
        " The evaluator failed but was unable to send an error message back to the driver.";
}

/// Delay before returning a container, giving the evaluator time to exit cleanly
pub const DEFAULT_RELEASE_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Window during which evaluators from a previous driver attempt may re-announce
pub const DEFAULT_RECONCILIATION_WINDOW: Duration = Duration::from_secs(60);

/// Default capacity of the lifecycle broadcast channel
pub const DEFAULT_PUBLISHER_CAPACITY: usize = 1000;
