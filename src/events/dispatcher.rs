//! # Evaluator Event Dispatcher
//!
//! Each evaluator owns one dispatcher. The lifecycle manager enqueues events while it holds
//! its lock and calls [`EvaluatorEventDispatcher::flush`] after releasing it, so handlers
//! see events in production order and may call back into the manager.
//!
//! ## Draining
//!
//! Only one thread drains a queue at a time. A `flush` that finds the queue already being
//! drained returns immediately; the active drainer delivers whatever was added. This also
//! covers handlers that trigger new events for the same evaluator: their events are
//! delivered after the current handler returns.

use super::publisher::EventPublisher;
use super::registry::EventHandlerRegistry;
use super::types::{
    ClosedContext, CompletedEvaluator, CompletedTask, ContextMessage, EvaluatorEvent,
    FailedContext, FailedEvaluator, FailedTask, SuspendedTask, TaskMessage,
};
use crate::evaluator::{ActiveContext, AllocatedEvaluator, RunningTask};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Sink for user-visible lifecycle events of one evaluator
///
/// Implementors provide [`dispatch`](Self::dispatch), [`is_empty`](Self::is_empty) and
/// [`flush`](Self::flush); the named entry points wrap the event and dispatch it.
pub trait EvaluatorEventDispatcher: Send + Sync {
    /// Accept an event for delivery
    fn dispatch(&self, event: EvaluatorEvent);

    /// No events queued or being delivered
    fn is_empty(&self) -> bool;

    /// Deliver queued events; returns how many this call delivered
    fn flush(&self) -> usize;

    fn on_evaluator_allocated(&self, evaluator: AllocatedEvaluator) {
        self.dispatch(EvaluatorEvent::EvaluatorAllocated(evaluator));
    }

    fn on_evaluator_completed(&self, evaluator: CompletedEvaluator) {
        self.dispatch(EvaluatorEvent::EvaluatorCompleted(evaluator));
    }

    fn on_evaluator_failed(&self, evaluator: FailedEvaluator) {
        self.dispatch(EvaluatorEvent::EvaluatorFailed(evaluator));
    }

    fn on_driver_restart_evaluator_failed(&self, evaluator: FailedEvaluator) {
        self.dispatch(EvaluatorEvent::DriverRestartEvaluatorFailed(evaluator));
    }

    fn on_context_active(&self, context: ActiveContext) {
        self.dispatch(EvaluatorEvent::ContextActive(context));
    }

    fn on_context_closed(&self, context: ClosedContext) {
        self.dispatch(EvaluatorEvent::ContextClosed(context));
    }

    fn on_context_failed(&self, context: FailedContext) {
        self.dispatch(EvaluatorEvent::ContextFailed(context));
    }

    fn on_context_message(&self, message: ContextMessage) {
        self.dispatch(EvaluatorEvent::ContextMessage(message));
    }

    fn on_task_running(&self, task: RunningTask) {
        self.dispatch(EvaluatorEvent::TaskRunning(task));
    }

    fn on_driver_restart_task_running(&self, task: RunningTask) {
        self.dispatch(EvaluatorEvent::DriverRestartTaskRunning(task));
    }

    fn on_task_suspended(&self, task: SuspendedTask) {
        self.dispatch(EvaluatorEvent::TaskSuspended(task));
    }

    fn on_task_completed(&self, task: CompletedTask) {
        self.dispatch(EvaluatorEvent::TaskCompleted(task));
    }

    fn on_task_failed(&self, task: FailedTask) {
        self.dispatch(EvaluatorEvent::TaskFailed(task));
    }

    fn on_task_message(&self, message: TaskMessage) {
        self.dispatch(EvaluatorEvent::TaskMessage(message));
    }
}

/// Queue-backed dispatcher delivering to an [`EventHandlerRegistry`]
pub struct EvaluatorMessageDispatcher {
    evaluator_id: String,
    queue: Mutex<VecDeque<EvaluatorEvent>>,
    /// Events accepted but not yet fully delivered
    pending: AtomicUsize,
    draining: AtomicBool,
    handlers: Arc<EventHandlerRegistry>,
    publisher: Option<EventPublisher>,
}

impl EvaluatorMessageDispatcher {
    pub fn new(
        evaluator_id: impl Into<String>,
        handlers: Arc<EventHandlerRegistry>,
        publisher: Option<EventPublisher>,
    ) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            queue: Mutex::new(VecDeque::new()),
            pending: AtomicUsize::new(0),
            draining: AtomicBool::new(false),
            handlers,
            publisher,
        }
    }

    pub fn evaluator_id(&self) -> &str {
        &self.evaluator_id
    }

    /// Number of events accepted but not yet delivered
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn deliver(&self, event: &EvaluatorEvent) {
        let kind = event.kind();
        let handlers = self.handlers.handlers_for(kind);
        if handlers.is_empty() {
            debug!(
                evaluator_id = %self.evaluator_id,
                event = kind.name(),
                "No handlers registered for evaluator event"
            );
        }

        for (name, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(
                    evaluator_id = %self.evaluator_id,
                    event = kind.name(),
                    handler = %name,
                    "❌ Evaluator event handler panicked"
                );
            }
        }

        if let Some(publisher) = &self.publisher {
            publisher.publish_event(event);
        }
    }
}

impl EvaluatorEventDispatcher for EvaluatorMessageDispatcher {
    fn dispatch(&self, event: EvaluatorEvent) {
        debug!(
            evaluator_id = %self.evaluator_id,
            event = event.name(),
            "Queueing evaluator event"
        );
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.queue.lock().push_back(event);
    }

    fn is_empty(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            if self.draining.swap(true, Ordering::AcqRel) {
                return delivered;
            }

            loop {
                let next = self.queue.lock().pop_front();
                let Some(event) = next else { break };
                self.deliver(&event);
                self.pending.fetch_sub(1, Ordering::AcqRel);
                delivered += 1;
            }

            self.draining.store(false, Ordering::Release);

            // An event enqueued between the last pop and releasing the drain flag would
            // otherwise sit until the next flush
            if self.queue.lock().is_empty() {
                return delivered;
            }
        }
    }
}

impl std::fmt::Debug for EvaluatorMessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorMessageDispatcher")
            .field("evaluator_id", &self.evaluator_id)
            .field("pending", &self.pending())
            .field("draining", &self.draining.load(Ordering::Relaxed))
            .finish()
    }
}
