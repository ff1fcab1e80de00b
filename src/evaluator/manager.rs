//! # Evaluator Manager
//!
//! Owns the lifecycle of one evaluator: its state, its task tracker and the one-shot
//! resource release. Heartbeats, resource manager status, launch, failure and close all
//! run under a single per-evaluator mutex, so a closed evaluator is never reopened.
//!
//! ## Event delivery
//!
//! Events are queued on the evaluator's dispatcher while the lock is held and flushed
//! once it is released. Handlers therefore observe events in order and may call back
//! into the manager, e.g. to submit a task from a context-active handler.
//!
//! ## Failure kinds
//!
//! Ordering bugs are returned as [`EvaluatorError::ProtocolViolation`]. An evaluator dying
//! is not an error: it becomes a [`FailedEvaluator`] event and the evaluator is closed.

use super::descriptor::{EvaluatorDescriptor, EvaluatorProcess};
use super::idleness::IdlenessSource;
use super::link::EvaluatorLink;
use super::sanity::HeartbeatSanityChecker;
use super::task::TaskRepresenter;
use super::AllocatedEvaluator;
use crate::codec::ExceptionCodec;
use crate::constants::messages;
use crate::context::ContextRegistry;
use crate::control::{EvaluatorControlHandler, ResourceLaunchHandler, ResourceReleaseHandler};
use crate::error::{EvaluatorError, EvaluatorException, EvaluatorResult};
use crate::events::{CompletedEvaluator, EvaluatorEventDispatcher, FailedEvaluator};
use crate::logging;
use crate::protocol::{
    ContextControlMessage, EvaluatorControlMessage, EvaluatorHeartbeat, EvaluatorStatus,
    RemoteMessage, ResourceLaunchEvent, ResourceReleaseEvent, ResourceStatusEvent, TaskStatus,
};
use crate::restart::RestartStateSource;
use crate::scheduler::Scheduler;
use crate::state_machine::{EvaluatorState, EvaluatorStatusManager, ReportedState, RestartState};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// What happened to a heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The heartbeat was applied
    Processed,
    /// The evaluator is already terminal; the heartbeat was a straggler
    Ignored,
    /// The evaluator missed the restart reconciliation window; the caller must close it
    Expired,
}

/// Shared collaborators handed to every manager
#[derive(Clone)]
pub struct ManagerCollaborators {
    pub dispatcher: Arc<dyn EvaluatorEventDispatcher>,
    pub contexts: Arc<dyn ContextRegistry>,
    pub control: Arc<EvaluatorControlHandler>,
    pub launch_handler: Arc<dyn ResourceLaunchHandler>,
    pub release_handler: Arc<dyn ResourceReleaseHandler>,
    pub restart: Arc<dyn RestartStateSource>,
    pub codec: Arc<dyn ExceptionCodec>,
    pub scheduler: Arc<dyn Scheduler>,
    pub idleness: Arc<dyn IdlenessSource>,
    /// `None` disables the timestamp check
    pub sanity_checker: Option<Arc<HeartbeatSanityChecker>>,
}

/// Everything guarded by the manager's lock
struct ManagerState {
    status: EvaluatorStatusManager,
    task: Option<TaskRepresenter>,
    resource_released: bool,
    /// Set by close; the idleness check runs once the lock is gone
    idleness_check_pending: bool,
}

/// Lifecycle manager of a single evaluator
pub struct EvaluatorManager {
    evaluator_id: String,
    descriptor: Arc<EvaluatorDescriptor>,
    driver_remote_id: String,
    link: Arc<EvaluatorLink>,
    release_grace_period: Duration,
    allocated_fired: AtomicBool,
    state: Mutex<ManagerState>,
    collaborators: ManagerCollaborators,
}

impl EvaluatorManager {
    pub fn new(
        link: Arc<EvaluatorLink>,
        descriptor: Arc<EvaluatorDescriptor>,
        driver_remote_id: impl Into<String>,
        release_grace_period: Duration,
        collaborators: ManagerCollaborators,
    ) -> Self {
        let evaluator_id = link.evaluator_id().to_string();
        info!(
            evaluator_id = %evaluator_id,
            node = %descriptor.node().node_id,
            memory_mb = descriptor.memory_mb(),
            cores = descriptor.cores(),
            "🆕 Evaluator allocated"
        );
        Self {
            state: Mutex::new(ManagerState {
                status: EvaluatorStatusManager::new(evaluator_id.clone()),
                task: None,
                resource_released: false,
                idleness_check_pending: false,
            }),
            evaluator_id,
            descriptor,
            driver_remote_id: driver_remote_id.into(),
            link,
            release_grace_period,
            allocated_fired: AtomicBool::new(false),
            collaborators,
        }
    }

    pub fn id(&self) -> &str {
        &self.evaluator_id
    }

    pub fn descriptor(&self) -> &Arc<EvaluatorDescriptor> {
        &self.descriptor
    }

    pub fn driver_remote_id(&self) -> &str {
        &self.driver_remote_id
    }

    pub fn state(&self) -> EvaluatorState {
        self.state.lock().status.state()
    }

    pub fn current_task_id(&self) -> Option<String> {
        self.state.lock().task.as_ref().map(|t| t.id().to_string())
    }

    pub fn set_process(&self, process: EvaluatorProcess) -> EvaluatorResult<()> {
        self.descriptor
            .set_process(process)
            .map_err(|_| EvaluatorError::ProcessAlreadySet {
                evaluator_id: self.evaluator_id.clone(),
            })
    }

    /// Fire the allocated event; only the first call has any effect
    pub fn fire_allocated_event(&self) {
        let guard = self.state.lock();
        if !guard.status.is_allocated() {
            warn!(
                evaluator_id = %self.evaluator_id,
                state = %guard.status,
                "Not firing allocated event for an evaluator past allocation"
            );
        } else if self.allocated_fired.swap(true, Ordering::AcqRel) {
            warn!(
                evaluator_id = %self.evaluator_id,
                "⚠️ Evaluator allocated event fired more than once"
            );
        } else {
            trace!(evaluator_id = %self.evaluator_id, "Firing allocated event");
            self.collaborators
                .dispatcher
                .on_evaluator_allocated(AllocatedEvaluator::new(
                    Arc::clone(&self.link),
                    Arc::clone(&self.descriptor),
                ));
        }
        self.complete(guard);
    }

    /// Hand a launch request to the resource manager; only legal while allocated
    pub fn on_resource_launch(&self, event: ResourceLaunchEvent) -> EvaluatorResult<()> {
        let mut guard = self.state.lock();
        if !guard.status.is_allocated() {
            error!(
                evaluator_id = %self.evaluator_id,
                state = %guard.status,
                "💥 Launch requested outside the allocated state"
            );
            return Err(EvaluatorError::protocol_violation(
                &self.evaluator_id,
                format!(
                    "launch expected state {} but evaluator is {}",
                    EvaluatorState::Allocated,
                    guard.status
                ),
            ));
        }
        guard.status.set_submitted();
        info!(
            evaluator_id = %self.evaluator_id,
            runtime = %event.process.runtime,
            with_task = event.task_configuration.is_some(),
            "🚀 Submitting evaluator launch"
        );
        logging::log_evaluator_operation(
            "launch",
            &self.evaluator_id,
            Some(&guard.status.state().to_string()),
            None,
            "submitted",
            Some(&event.process.runtime),
        );
        self.collaborators.launch_handler.on_launch(event);
        drop(guard);
        Ok(())
    }

    /// Apply a heartbeat
    pub fn on_evaluator_heartbeat(
        &self,
        heartbeat: RemoteMessage<EvaluatorHeartbeat>,
    ) -> EvaluatorResult<HeartbeatOutcome> {
        let mut guard = self.state.lock();
        let outcome = self.process_heartbeat(&mut guard, heartbeat);
        self.complete(guard);
        outcome
    }

    fn process_heartbeat(
        &self,
        state: &mut ManagerState,
        heartbeat: RemoteMessage<EvaluatorHeartbeat>,
    ) -> EvaluatorResult<HeartbeatOutcome> {
        let RemoteMessage { sender, message } = heartbeat;
        trace!(
            evaluator_id = %self.evaluator_id,
            timestamp = message.timestamp,
            contexts = message.context_status.len(),
            has_task = message.task_status.is_some(),
            "Evaluator heartbeat"
        );

        if state.status.is_done_or_failed_or_killed() {
            debug!(
                evaluator_id = %self.evaluator_id,
                state = %state.status,
                "Ignoring heartbeat for a terminated evaluator"
            );
            return Ok(HeartbeatOutcome::Ignored);
        }

        if let Some(checker) = &self.collaborators.sanity_checker {
            checker.check(&self.evaluator_id, message.timestamp);
        }

        let mut restart_state = self.collaborators.restart.restart_state(&self.evaluator_id);

        if state.status.is_submitted()
            || matches!(restart_state, RestartState::Reported | RestartState::Expired)
        {
            self.collaborators.control.set_remote_id(sender);

            if restart_state == RestartState::Expired {
                warn!(
                    evaluator_id = %self.evaluator_id,
                    "⏰ Heartbeat from an evaluator whose reconciliation window expired"
                );
                return Ok(HeartbeatOutcome::Expired);
            }

            state.status.set_running();
            info!(evaluator_id = %self.evaluator_id, "✅ Evaluator is running");

            if restart_state == RestartState::Reported {
                self.collaborators.restart.mark_reregistered(&self.evaluator_id);
                restart_state = RestartState::Reregistered;
            }
        }

        if let Some(evaluator_status) = &message.evaluator_status {
            self.on_evaluator_status(state, evaluator_status);
            // The failure event already carries every context and the task
            if state.status.is_failed() {
                debug!(
                    evaluator_id = %self.evaluator_id,
                    "Evaluator failed; skipping context and task statuses"
                );
                return Ok(HeartbeatOutcome::Processed);
            }
        }

        let notify_new = message.task_status.is_none();
        self.collaborators
            .contexts
            .on_context_status_messages(&message.context_status, notify_new)?;

        if let Some(task_status) = &message.task_status {
            self.on_task_status(state, task_status, restart_state)?;
        }

        Ok(HeartbeatOutcome::Processed)
    }

    fn on_evaluator_status(&self, state: &mut ManagerState, status: &EvaluatorStatus) {
        match status.state {
            ReportedState::Done => {
                info!(evaluator_id = %self.evaluator_id, "🏁 Evaluator done");
                state.status.set_done();
                self.collaborators
                    .dispatcher
                    .on_evaluator_completed(CompletedEvaluator {
                        evaluator_id: self.evaluator_id.clone(),
                    });
                self.close_locked(state);
            }
            ReportedState::Failed => {
                let exception = match status.error.as_deref() {
                    Some(bytes) => match self.collaborators.codec.decode(bytes) {
                        Some(cause) => EvaluatorException::with_cause(&self.evaluator_id, cause),
                        None => EvaluatorException::new(
                            &self.evaluator_id,
                            messages::UNDECODABLE_EXCEPTION,
                        ),
                    },
                    None => EvaluatorException::new(&self.evaluator_id, messages::NO_EXCEPTION_SENT),
                };
                self.on_evaluator_exception_locked(state, exception);
            }
            ReportedState::Init
            | ReportedState::Running
            | ReportedState::Suspend
            | ReportedState::Killed => {}
        }
    }

    fn on_task_status(
        &self,
        state: &mut ManagerState,
        status: &TaskStatus,
        restart_state: RestartState,
    ) -> EvaluatorResult<()> {
        let tracked = state
            .task
            .as_ref()
            .is_some_and(|task| task.id() == status.task_id);

        if !tracked {
            let legal_first_state = matches!(
                status.state,
                ReportedState::Init | ReportedState::Failed | ReportedState::Running
            );
            if !legal_first_state && restart_state != RestartState::Reregistered {
                error!(
                    evaluator_id = %self.evaluator_id,
                    task_id = %status.task_id,
                    reported = %status.state,
                    "💥 Unknown task reported a state it cannot start in"
                );
                return Err(EvaluatorError::protocol_violation(
                    &self.evaluator_id,
                    format!(
                        "received {} for unknown task {}; expected INIT, RUNNING or FAILED",
                        status.state, status.task_id
                    ),
                ));
            }
            if status.state == ReportedState::Running {
                warn!(
                    evaluator_id = %self.evaluator_id,
                    task_id = %status.task_id,
                    "Task reported RUNNING before INIT; heartbeats arrived out of order"
                );
            }

            let context = self
                .collaborators
                .contexts
                .get_context(&status.context_id)
                .ok_or_else(|| {
                    EvaluatorError::protocol_violation(
                        &self.evaluator_id,
                        format!(
                            "task {} runs in unknown context {}",
                            status.task_id, status.context_id
                        ),
                    )
                })?;
            state.task = Some(TaskRepresenter::new(
                status.task_id.clone(),
                context,
                Arc::clone(&self.collaborators.dispatcher),
                Arc::clone(&self.collaborators.codec),
            ));
        }

        if let Some(task) = state.task.as_mut() {
            task.on_task_status(status, restart_state)?;
            if task.is_not_running() {
                debug!(
                    evaluator_id = %self.evaluator_id,
                    task_id = %task.id(),
                    state = %task.state(),
                    "Task no longer running; dropping tracker"
                );
                state.task = None;
            }
        }
        Ok(())
    }

    /// Route an evaluator failure; ignored once the evaluator is terminal
    pub fn on_evaluator_exception(&self, exception: EvaluatorException) {
        let mut guard = self.state.lock();
        self.on_evaluator_exception_locked(&mut guard, exception);
        self.complete(guard);
    }

    fn on_evaluator_exception_locked(&self, state: &mut ManagerState, exception: EvaluatorException) {
        if state.status.is_done_or_failed_or_killed() {
            debug!(
                evaluator_id = %self.evaluator_id,
                state = %state.status,
                "Ignoring failure of a terminated evaluator"
            );
            return;
        }

        warn!(
            evaluator_id = %self.evaluator_id,
            kind = %exception.kind(),
            message = %exception.message(),
            "❌ Evaluator failed"
        );

        logging::log_evaluator_operation(
            "fail",
            &self.evaluator_id,
            Some(&state.status.state().to_string()),
            state.task.as_ref().map(|task| task.id()),
            "failed",
            Some(exception.message()),
        );

        let failed_contexts = self
            .collaborators
            .contexts
            .failed_contexts_for_evaluator_failure();
        let failed_task = state.task.take().map(|task| task.evaluator_crash_failure());
        let failed = FailedEvaluator::new(
            self.evaluator_id.clone(),
            exception,
            failed_contexts,
            failed_task,
        );

        let restart_state = self.collaborators.restart.restart_state(&self.evaluator_id);
        if restart_state.is_failed_or_expired() {
            self.collaborators
                .dispatcher
                .on_driver_restart_evaluator_failed(failed);
        } else {
            self.collaborators.dispatcher.on_evaluator_failed(failed);
        }

        state.status.set_failed();
        self.close_locked(state);
    }

    /// Reconcile the resource manager's view of the container with ours
    pub fn on_resource_status(&self, event: ResourceStatusEvent) {
        let mut guard = self.state.lock();
        self.on_resource_status_locked(&mut guard, event);
        self.complete(guard);
    }

    fn on_resource_status_locked(&self, state: &mut ManagerState, event: ResourceStatusEvent) {
        if state.status.is_done_or_failed_or_killed() {
            trace!(
                evaluator_id = %self.evaluator_id,
                reported = %event.state,
                "Resource status for a terminated evaluator"
            );
            return;
        }
        if !event.state.is_done_or_failed_or_killed() {
            trace!(
                evaluator_id = %self.evaluator_id,
                reported = %event.state,
                "Resource manager reports container alive"
            );
            return;
        }

        let mut message = format!(
            "Resource manager reported container {} while evaluator was {}.",
            event.state, state.status
        );
        if state.status.is_submitted() {
            message.push_str(messages::FAILED_BEFORE_LINK);
        } else if state.status.is_allocated() {
            message.push_str(messages::FAILED_BEFORE_USE);
        } else if state.status.is_running() {
            message.push_str(messages::FAILED_WITHOUT_REPORT);
        }
        if let Some(task) = &state.task {
            message.push_str(&format!(
                " Task {} was running when the evaluator crashed.",
                task.id()
            ));
        }
        if let Some(code) = event.exit_code {
            message.push_str(&format!(" Exit code {code}."));
        }
        if let Some(diagnostics) = &event.diagnostics {
            message.push_str(&format!(" Diagnostics: {diagnostics}"));
        }

        let exception = if event.state == ReportedState::Killed {
            EvaluatorException::killed_by_resource_manager(&self.evaluator_id, message)
        } else {
            EvaluatorException::new(&self.evaluator_id, message)
        };
        self.on_evaluator_exception_locked(state, exception);
    }

    /// Shut the evaluator down and return its container; safe to call repeatedly
    pub fn close(&self) {
        let mut guard = self.state.lock();
        self.close_locked(&mut guard);
        self.complete(guard);
    }

    fn close_locked(&self, state: &mut ManagerState) {
        if state.status.is_allocated_or_submitted_or_running() {
            warn!(
                evaluator_id = %self.evaluator_id,
                state = %state.status,
                "Dirty shutdown of running evaluator"
            );
            if state.status.is_running() {
                // The evaluator exits without confirming a kill
                let kill = EvaluatorControlMessage::kill(&self.evaluator_id);
                if let Err(e) = self.collaborators.control.send(&kill) {
                    warn!(
                        evaluator_id = %self.evaluator_id,
                        error = %e,
                        "Failed to send kill to evaluator"
                    );
                }
            }
            state.status.set_killed();
        }

        if state.resource_released {
            warn!(
                evaluator_id = %self.evaluator_id,
                "⚠️ Evaluator closed more than once; resource already released"
            );
        } else {
            state.resource_released = true;
            logging::log_evaluator_operation(
                "close",
                &self.evaluator_id,
                Some(&state.status.state().to_string()),
                None,
                "releasing",
                None,
            );
            self.release_resource();
        }

        if let Some(checker) = &self.collaborators.sanity_checker {
            checker.forget(&self.evaluator_id);
        }
        state.idleness_check_pending = true;
    }

    fn release_resource(&self) {
        let release_handler = Arc::clone(&self.collaborators.release_handler);
        let evaluator_id = self.evaluator_id.clone();
        let scheduled = self.collaborators.scheduler.schedule_after(
            self.release_grace_period,
            Box::new(move || {
                debug!(evaluator_id = %evaluator_id, "Releasing evaluator container");
                release_handler.on_release(ResourceReleaseEvent { evaluator_id });
            }),
        );

        if let Err(e) = scheduled {
            warn!(
                evaluator_id = %self.evaluator_id,
                error = %e,
                "Releasing resource immediately; scheduler unavailable"
            );
            self.collaborators
                .release_handler
                .on_release(ResourceReleaseEvent {
                    evaluator_id: self.evaluator_id.clone(),
                });
        }
    }

    /// Terminal and every event delivered
    pub fn is_closed(&self) -> bool {
        self.collaborators.dispatcher.is_empty() && self.is_terminal()
    }

    fn is_terminal(&self) -> bool {
        self.state.lock().status.is_done_or_failed_or_killed()
    }

    /// Wrap and push a context control message to the evaluator
    pub fn send_context_control_message(
        &self,
        message: ContextControlMessage,
    ) -> EvaluatorResult<()> {
        trace!(evaluator_id = %self.evaluator_id, "Context control message");
        self.send_evaluator_control_message(EvaluatorControlMessage::context_control(
            &self.evaluator_id,
            message,
        ))
    }

    /// Push a control message to the evaluator; fire and forget
    pub fn send_evaluator_control_message(
        &self,
        message: EvaluatorControlMessage,
    ) -> EvaluatorResult<()> {
        let _guard = self.state.lock();
        self.collaborators.control.send(&message)?;
        Ok(())
    }

    /// Release the lock, deliver queued events, then check idleness if needed
    fn complete(&self, mut guard: MutexGuard<'_, ManagerState>) {
        let check_idleness = std::mem::take(&mut guard.idleness_check_pending);
        drop(guard);

        let delivered = self.collaborators.dispatcher.flush();
        // A close triggered from inside a handler could not see its own events drained
        if check_idleness || (delivered > 0 && self.is_terminal()) {
            self.collaborators.idleness.check();
        }
    }
}

impl fmt::Display for EvaluatorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(f, "EvaluatorManager[{}] state={}", self.evaluator_id, state.status)?;
        if let Some(task) = &state.task {
            write!(f, " task={}", task.id())?;
        }
        Ok(())
    }
}

impl fmt::Debug for EvaluatorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorManager")
            .field("evaluator_id", &self.evaluator_id)
            .field("driver_remote_id", &self.driver_remote_id)
            .field("release_grace_period", &self.release_grace_period)
            .finish()
    }
}
