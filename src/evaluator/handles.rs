//! User-facing handles on live contexts and tasks.
//!
//! Handles are cheap to clone and only hold a weak link to the evaluator manager. Every
//! operation becomes a one-way context control message; the outcome shows up later as a
//! lifecycle event.

use super::link::EvaluatorLink;
use crate::error::EvaluatorResult;
use crate::protocol::ContextControlMessage;
use std::fmt;
use std::sync::Arc;

/// A context that is up and ready to accept work
#[derive(Clone)]
pub struct ActiveContext {
    context_id: String,
    parent_id: Option<String>,
    link: Arc<EvaluatorLink>,
}

impl ActiveContext {
    pub fn new(
        context_id: impl Into<String>,
        parent_id: Option<String>,
        link: Arc<EvaluatorLink>,
    ) -> Self {
        Self {
            context_id: context_id.into(),
            parent_id,
            link,
        }
    }

    pub fn id(&self) -> &str {
        &self.context_id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn evaluator_id(&self) -> &str {
        self.link.evaluator_id()
    }

    /// Start a task in this context
    pub fn submit_task(&self, task_configuration: impl Into<String>) -> EvaluatorResult<()> {
        self.send(ContextControlMessage::StartTask {
            context_id: self.context_id.clone(),
            configuration: task_configuration.into(),
        })
    }

    /// Stack a child context on top of this one
    pub fn submit_context(&self, context_configuration: impl Into<String>) -> EvaluatorResult<()> {
        self.send(ContextControlMessage::AddContext {
            parent_context_id: self.context_id.clone(),
            configuration: context_configuration.into(),
        })
    }

    pub fn send_message(&self, message: Vec<u8>) -> EvaluatorResult<()> {
        self.send(ContextControlMessage::ContextMessage {
            context_id: self.context_id.clone(),
            message,
        })
    }

    /// Ask the evaluator to pop this context
    pub fn close(&self) -> EvaluatorResult<()> {
        self.send(ContextControlMessage::RemoveContext {
            context_id: self.context_id.clone(),
        })
    }

    fn send(&self, message: ContextControlMessage) -> EvaluatorResult<()> {
        self.link.manager()?.send_context_control_message(message)
    }
}

impl PartialEq for ActiveContext {
    fn eq(&self, other: &Self) -> bool {
        self.context_id == other.context_id && self.evaluator_id() == other.evaluator_id()
    }
}

impl Eq for ActiveContext {}

impl fmt::Debug for ActiveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveContext")
            .field("context_id", &self.context_id)
            .field("parent_id", &self.parent_id)
            .field("evaluator_id", &self.evaluator_id())
            .finish()
    }
}

/// A task that is running inside an [`ActiveContext`]
#[derive(Clone, PartialEq, Eq)]
pub struct RunningTask {
    task_id: String,
    context: ActiveContext,
}

impl RunningTask {
    pub fn new(task_id: impl Into<String>, context: ActiveContext) -> Self {
        Self {
            task_id: task_id.into(),
            context,
        }
    }

    pub fn id(&self) -> &str {
        &self.task_id
    }

    pub fn active_context(&self) -> &ActiveContext {
        &self.context
    }

    pub fn evaluator_id(&self) -> &str {
        self.context.evaluator_id()
    }

    /// Deliver a message to the task
    pub fn send(&self, message: Vec<u8>) -> EvaluatorResult<()> {
        self.context.send(ContextControlMessage::TaskMessage { message })
    }

    /// Ask the task to suspend; it reports back with a suspended event
    pub fn suspend(&self, message: Option<Vec<u8>>) -> EvaluatorResult<()> {
        self.context.send(ContextControlMessage::SuspendTask { message })
    }

    /// Ask the task to stop; it reports back with a completed event
    pub fn close(&self, message: Option<Vec<u8>>) -> EvaluatorResult<()> {
        self.context.send(ContextControlMessage::StopTask { message })
    }
}

impl fmt::Debug for RunningTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningTask")
            .field("task_id", &self.task_id)
            .field("context_id", &self.context.id())
            .field("evaluator_id", &self.evaluator_id())
            .finish()
    }
}
