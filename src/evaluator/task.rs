use super::handles::{ActiveContext, RunningTask};
use crate::codec::ExceptionCodec;
use crate::constants::messages;
use crate::error::{EvaluatorError, EvaluatorResult};
use crate::events::{
    CompletedTask, EvaluatorEventDispatcher, FailedTask, SuspendedTask, TaskMessage,
};
use crate::protocol::TaskStatus;
use crate::state_machine::{ReportedState, RestartState};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tracks the one task running on an evaluator and turns its status reports into events
pub struct TaskRepresenter {
    task_id: String,
    context: ActiveContext,
    state: ReportedState,
    /// Whether a running event has been dispatched for this task
    announced: bool,
    dispatcher: Arc<dyn EvaluatorEventDispatcher>,
    codec: Arc<dyn ExceptionCodec>,
}

impl TaskRepresenter {
    pub fn new(
        task_id: impl Into<String>,
        context: ActiveContext,
        dispatcher: Arc<dyn EvaluatorEventDispatcher>,
        codec: Arc<dyn ExceptionCodec>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context,
            state: ReportedState::Init,
            announced: false,
            dispatcher,
            codec,
        }
    }

    pub fn id(&self) -> &str {
        &self.task_id
    }

    pub fn context(&self) -> &ActiveContext {
        &self.context
    }

    pub fn state(&self) -> ReportedState {
        self.state
    }

    /// The task has reached a state from which it never runs again
    pub fn is_not_running(&self) -> bool {
        !matches!(self.state, ReportedState::Init | ReportedState::Running)
    }

    /// Apply a status report from the evaluator
    pub fn on_task_status(
        &mut self,
        status: &TaskStatus,
        restart_state: RestartState,
    ) -> EvaluatorResult<()> {
        if status.task_id != self.task_id {
            return Err(self.violation(format!(
                "received status for task {} on representer of task {}",
                status.task_id, self.task_id
            )));
        }
        if status.context_id != self.context.id() {
            return Err(self.violation(format!(
                "task {} reported context {} but runs in context {}",
                self.task_id,
                status.context_id,
                self.context.id()
            )));
        }
        if self.is_not_running() {
            return Err(self.violation(format!(
                "task {} reported {} after reaching {}",
                self.task_id, status.state, self.state
            )));
        }

        match status.state {
            ReportedState::Init => self.on_task_init(),
            ReportedState::Running => self.on_task_running(status, restart_state),
            ReportedState::Suspend => self.on_task_suspended(status),
            ReportedState::Done => self.on_task_done(status),
            ReportedState::Failed => self.on_task_failed(status),
            ReportedState::Killed => {
                debug!(
                    evaluator_id = %self.context.evaluator_id(),
                    task_id = %self.task_id,
                    "Task killed"
                );
                self.state = ReportedState::Killed;
            }
        }
        Ok(())
    }

    fn on_task_init(&mut self) {
        if self.announced {
            warn!(
                evaluator_id = %self.context.evaluator_id(),
                task_id = %self.task_id,
                "Ignoring repeated INIT for a known task"
            );
            return;
        }
        self.dispatcher.on_task_running(self.running_task());
        self.announced = true;
        self.state = ReportedState::Running;
    }

    fn on_task_running(&mut self, status: &TaskStatus, restart_state: RestartState) {
        if !self.announced {
            if restart_state == RestartState::Reregistered {
                info!(
                    evaluator_id = %self.context.evaluator_id(),
                    task_id = %self.task_id,
                    "🔄 Task survived driver restart"
                );
                self.dispatcher
                    .on_driver_restart_task_running(self.running_task());
            } else {
                self.dispatcher.on_task_running(self.running_task());
            }
            self.announced = true;
        }
        self.state = ReportedState::Running;

        for message in &status.messages {
            self.dispatcher.on_task_message(TaskMessage {
                task_id: self.task_id.clone(),
                context_id: self.context.id().to_string(),
                evaluator_id: self.context.evaluator_id().to_string(),
                source_id: message.source_id.clone(),
                message: message.message.clone(),
            });
        }
    }

    fn on_task_suspended(&mut self, status: &TaskStatus) {
        self.dispatcher.on_task_suspended(SuspendedTask {
            task_id: self.task_id.clone(),
            active_context: self.context.clone(),
            memento: status.result.clone(),
        });
        self.state = ReportedState::Suspend;
    }

    fn on_task_done(&mut self, status: &TaskStatus) {
        self.dispatcher.on_task_completed(CompletedTask {
            task_id: self.task_id.clone(),
            active_context: self.context.clone(),
            result: status.result.clone(),
        });
        self.state = ReportedState::Done;
    }

    fn on_task_failed(&mut self, status: &TaskStatus) {
        let cause = status
            .result
            .as_deref()
            .and_then(|bytes| self.codec.decode(bytes));
        let message = cause
            .as_ref()
            .map(|c| c.message.clone())
            .unwrap_or_else(|| messages::TASK_FAILURE_NO_MESSAGE.to_string());
        let description = cause.as_ref().map(|c| c.to_string());

        warn!(
            evaluator_id = %self.context.evaluator_id(),
            task_id = %self.task_id,
            message = %message,
            "❌ Task failed"
        );
        self.dispatcher.on_task_failed(FailedTask {
            task_id: self.task_id.clone(),
            evaluator_id: self.context.evaluator_id().to_string(),
            message,
            description,
            cause,
            data: None,
            active_context: Some(self.context.clone()),
        });
        self.state = ReportedState::Failed;
    }

    /// Failure record for a task whose evaluator died underneath it
    pub fn evaluator_crash_failure(&self) -> FailedTask {
        FailedTask {
            task_id: self.task_id.clone(),
            evaluator_id: self.context.evaluator_id().to_string(),
            message: messages::EVALUATOR_CRASH.to_string(),
            description: None,
            cause: None,
            data: None,
            active_context: None,
        }
    }

    fn running_task(&self) -> RunningTask {
        RunningTask::new(self.task_id.clone(), self.context.clone())
    }

    fn violation(&self, message: String) -> EvaluatorError {
        EvaluatorError::protocol_violation(self.context.evaluator_id(), message)
    }
}

impl std::fmt::Debug for TaskRepresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRepresenter")
            .field("task_id", &self.task_id)
            .field("context_id", &self.context.id())
            .field("state", &self.state)
            .field("announced", &self.announced)
            .finish()
    }
}
