//! # Lifecycle Event Types
//!
//! Every user-visible lifecycle change of an evaluator, its contexts and its task is one
//! [`EvaluatorEvent`]. Failure records are built once and never mutated after dispatch.

use crate::codec::RemoteException;
use crate::constants::events as names;
use crate::error::EvaluatorException;
use crate::evaluator::{ActiveContext, AllocatedEvaluator, RunningTask};
use serde_json::{json, Value};

/// An evaluator shut down cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedEvaluator {
    pub evaluator_id: String,
}

/// An evaluator died, together with everything that died with it
#[derive(Debug, Clone)]
pub struct FailedEvaluator {
    evaluator_id: String,
    exception: EvaluatorException,
    failed_contexts: Vec<FailedContext>,
    failed_task: Option<FailedTask>,
}

impl FailedEvaluator {
    pub fn new(
        evaluator_id: impl Into<String>,
        exception: EvaluatorException,
        failed_contexts: Vec<FailedContext>,
        failed_task: Option<FailedTask>,
    ) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            exception,
            failed_contexts,
            failed_task,
        }
    }

    pub fn evaluator_id(&self) -> &str {
        &self.evaluator_id
    }

    pub fn exception(&self) -> &EvaluatorException {
        &self.exception
    }

    /// Contexts that were live on the evaluator, innermost first
    pub fn failed_contexts(&self) -> &[FailedContext] {
        &self.failed_contexts
    }

    pub fn failed_task(&self) -> Option<&FailedTask> {
        self.failed_task.as_ref()
    }
}

/// A context that failed, either on its own or because its evaluator died
#[derive(Debug, Clone, PartialEq)]
pub struct FailedContext {
    pub context_id: String,
    pub evaluator_id: String,
    pub message: String,
    pub description: Option<String>,
    pub cause: Option<RemoteException>,
    /// The context below the failed one, still usable unless the evaluator died
    pub parent_context: Option<ActiveContext>,
}

/// A context that was closed on request
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedContext {
    pub context_id: String,
    pub evaluator_id: String,
    pub parent_context: Option<ActiveContext>,
}

/// A message sent by a context to the driver
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMessage {
    pub context_id: String,
    pub evaluator_id: String,
    pub source_id: String,
    pub message: Vec<u8>,
}

/// A task that suspended itself, leaving its context free
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendedTask {
    pub task_id: String,
    pub active_context: ActiveContext,
    pub memento: Option<Vec<u8>>,
}

/// A task that returned
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTask {
    pub task_id: String,
    pub active_context: ActiveContext,
    pub result: Option<Vec<u8>>,
}

/// A task that failed
#[derive(Debug, Clone, PartialEq)]
pub struct FailedTask {
    pub task_id: String,
    pub evaluator_id: String,
    pub message: String,
    pub description: Option<String>,
    pub cause: Option<RemoteException>,
    pub data: Option<Vec<u8>>,
    /// Absent when the whole evaluator went down with the task
    pub active_context: Option<ActiveContext>,
}

/// A message sent by a running task to the driver
#[derive(Debug, Clone, PartialEq)]
pub struct TaskMessage {
    pub task_id: String,
    pub context_id: String,
    pub evaluator_id: String,
    pub source_id: String,
    pub message: Vec<u8>,
}

/// Discriminant of [`EvaluatorEvent`], used to register handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluatorEventKind {
    EvaluatorAllocated,
    EvaluatorCompleted,
    EvaluatorFailed,
    DriverRestartEvaluatorFailed,
    ContextActive,
    ContextClosed,
    ContextFailed,
    ContextMessage,
    TaskRunning,
    DriverRestartTaskRunning,
    TaskSuspended,
    TaskCompleted,
    TaskFailed,
    TaskMessage,
}

impl EvaluatorEventKind {
    /// Name under which the event is published
    pub fn name(&self) -> &'static str {
        match self {
            Self::EvaluatorAllocated => names::EVALUATOR_ALLOCATED,
            Self::EvaluatorCompleted => names::EVALUATOR_COMPLETED,
            Self::EvaluatorFailed => names::EVALUATOR_FAILED,
            Self::DriverRestartEvaluatorFailed => names::EVALUATOR_RESTART_FAILED,
            Self::ContextActive => names::CONTEXT_ACTIVE,
            Self::ContextClosed => names::CONTEXT_CLOSED,
            Self::ContextFailed => names::CONTEXT_FAILED,
            Self::ContextMessage => names::CONTEXT_MESSAGE,
            Self::TaskRunning => names::TASK_RUNNING,
            Self::DriverRestartTaskRunning => names::TASK_RESTART_RUNNING,
            Self::TaskSuspended => names::TASK_SUSPENDED,
            Self::TaskCompleted => names::TASK_COMPLETED,
            Self::TaskFailed => names::TASK_FAILED,
            Self::TaskMessage => names::TASK_MESSAGE,
        }
    }

    /// Whether the event reports the end of an evaluator's life
    pub fn is_evaluator_terminal(&self) -> bool {
        matches!(
            self,
            Self::EvaluatorCompleted | Self::EvaluatorFailed | Self::DriverRestartEvaluatorFailed
        )
    }
}

/// A user-visible lifecycle event
#[derive(Debug, Clone)]
pub enum EvaluatorEvent {
    EvaluatorAllocated(AllocatedEvaluator),
    EvaluatorCompleted(CompletedEvaluator),
    EvaluatorFailed(FailedEvaluator),
    DriverRestartEvaluatorFailed(FailedEvaluator),
    ContextActive(ActiveContext),
    ContextClosed(ClosedContext),
    ContextFailed(FailedContext),
    ContextMessage(ContextMessage),
    TaskRunning(RunningTask),
    DriverRestartTaskRunning(RunningTask),
    TaskSuspended(SuspendedTask),
    TaskCompleted(CompletedTask),
    TaskFailed(FailedTask),
    TaskMessage(TaskMessage),
}

impl EvaluatorEvent {
    pub fn kind(&self) -> EvaluatorEventKind {
        match self {
            Self::EvaluatorAllocated(_) => EvaluatorEventKind::EvaluatorAllocated,
            Self::EvaluatorCompleted(_) => EvaluatorEventKind::EvaluatorCompleted,
            Self::EvaluatorFailed(_) => EvaluatorEventKind::EvaluatorFailed,
            Self::DriverRestartEvaluatorFailed(_) => {
                EvaluatorEventKind::DriverRestartEvaluatorFailed
            }
            Self::ContextActive(_) => EvaluatorEventKind::ContextActive,
            Self::ContextClosed(_) => EvaluatorEventKind::ContextClosed,
            Self::ContextFailed(_) => EvaluatorEventKind::ContextFailed,
            Self::ContextMessage(_) => EvaluatorEventKind::ContextMessage,
            Self::TaskRunning(_) => EvaluatorEventKind::TaskRunning,
            Self::DriverRestartTaskRunning(_) => EvaluatorEventKind::DriverRestartTaskRunning,
            Self::TaskSuspended(_) => EvaluatorEventKind::TaskSuspended,
            Self::TaskCompleted(_) => EvaluatorEventKind::TaskCompleted,
            Self::TaskFailed(_) => EvaluatorEventKind::TaskFailed,
            Self::TaskMessage(_) => EvaluatorEventKind::TaskMessage,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn evaluator_id(&self) -> &str {
        match self {
            Self::EvaluatorAllocated(e) => e.id(),
            Self::EvaluatorCompleted(e) => &e.evaluator_id,
            Self::EvaluatorFailed(e) | Self::DriverRestartEvaluatorFailed(e) => e.evaluator_id(),
            Self::ContextActive(c) => c.evaluator_id(),
            Self::ContextClosed(c) => &c.evaluator_id,
            Self::ContextFailed(c) => &c.evaluator_id,
            Self::ContextMessage(m) => &m.evaluator_id,
            Self::TaskRunning(t) | Self::DriverRestartTaskRunning(t) => t.evaluator_id(),
            Self::TaskSuspended(t) => t.active_context.evaluator_id(),
            Self::TaskCompleted(t) => t.active_context.evaluator_id(),
            Self::TaskFailed(t) => &t.evaluator_id,
            Self::TaskMessage(m) => &m.evaluator_id,
        }
    }

    /// Compact JSON description used when the event is published
    pub fn summary(&self) -> Value {
        let mut summary = json!({ "evaluator_id": self.evaluator_id() });
        match self {
            Self::EvaluatorFailed(e) | Self::DriverRestartEvaluatorFailed(e) => {
                summary["failure_kind"] = json!(e.exception().kind());
                summary["message"] = json!(e.exception().message());
                summary["failed_contexts"] = json!(e.failed_contexts().len());
                if let Some(task) = e.failed_task() {
                    summary["task_id"] = json!(task.task_id);
                }
            }
            Self::ContextActive(c) => summary["context_id"] = json!(c.id()),
            Self::ContextClosed(c) => summary["context_id"] = json!(c.context_id),
            Self::ContextFailed(c) => {
                summary["context_id"] = json!(c.context_id);
                summary["message"] = json!(c.message);
            }
            Self::ContextMessage(m) => {
                summary["context_id"] = json!(m.context_id);
                summary["source_id"] = json!(m.source_id);
            }
            Self::TaskRunning(t) | Self::DriverRestartTaskRunning(t) => {
                summary["task_id"] = json!(t.id());
            }
            Self::TaskSuspended(t) => summary["task_id"] = json!(t.task_id),
            Self::TaskCompleted(t) => summary["task_id"] = json!(t.task_id),
            Self::TaskFailed(t) => {
                summary["task_id"] = json!(t.task_id);
                summary["message"] = json!(t.message);
            }
            Self::TaskMessage(m) => {
                summary["task_id"] = json!(m.task_id);
                summary["source_id"] = json!(m.source_id);
            }
            Self::EvaluatorAllocated(_) | Self::EvaluatorCompleted(_) => {}
        }
        summary
    }
}
