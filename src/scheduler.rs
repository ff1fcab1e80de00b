//! # Delayed Work
//!
//! The evaluator core schedules exactly one kind of future work: the grace delay before a
//! container is returned to the resource manager. Callers fall back to running the work
//! immediately when [`Scheduler::schedule_after`] reports the scheduler is unavailable.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// Errors from scheduling delayed work
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The clock backing the scheduler has been torn down
    #[error("Scheduler unavailable: {reason}")]
    Unavailable { reason: String },
}

impl SchedulerError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Callback run once a delay elapses
pub type ScheduledCallback = Box<dyn FnOnce() + Send + 'static>;

/// Runs callbacks after a delay
pub trait Scheduler: Send + Sync {
    fn schedule_after(&self, delay: Duration, callback: ScheduledCallback)
        -> Result<(), SchedulerError>;
}

/// Scheduler backed by a tokio runtime
#[derive(Debug)]
pub struct TokioScheduler {
    handle: Handle,
    closed: AtomicBool,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            closed: AtomicBool::new(false),
        }
    }

    /// Build a scheduler on the runtime the caller is running in
    pub fn current() -> Result<Self, SchedulerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SchedulerError::unavailable(e.to_string()))
    }

    /// Refuse new work; already scheduled callbacks still run
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("⏹️ Scheduler shut down");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(
        &self,
        delay: Duration,
        callback: ScheduledCallback,
    ) -> Result<(), SchedulerError> {
        if self.is_shutdown() {
            return Err(SchedulerError::unavailable("scheduler has been shut down"));
        }
        let slot = Arc::new(Mutex::new(Some(callback)));
        let pending = Arc::clone(&slot);
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let callback = pending.lock().take();
            if let Some(callback) = callback {
                callback();
            }
        });

        // A runtime that is gone cancels the task before it is ever polled
        if task.is_finished() && slot.lock().take().is_some() {
            debug!("⏹️ Runtime behind scheduler has shut down");
            return Err(SchedulerError::unavailable("runtime has been shut down"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_callback_runs_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let (sender, receiver) = tokio::sync::oneshot::channel();

        scheduler
            .schedule_after(
                Duration::from_millis(10),
                Box::new(move || {
                    let _ = sender.send(());
                }),
            )
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), receiver)
            .await
            .expect("callback should run")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let scheduler = TokioScheduler::current().unwrap();
        scheduler.shutdown();

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let result = scheduler.schedule_after(
            Duration::from_millis(1),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(matches!(result, Err(SchedulerError::Unavailable { .. })));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropped_runtime_rejects_new_work() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let scheduler = TokioScheduler::new(runtime.handle().clone());
        drop(runtime);

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let result = scheduler.schedule_after(
            Duration::from_millis(1),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(matches!(result, Err(SchedulerError::Unavailable { .. })));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_current_outside_runtime() {
        assert!(TokioScheduler::current().is_err());
    }
}
