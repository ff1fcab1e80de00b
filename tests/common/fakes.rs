use evaluator_core::control::{
    ControlError, ControlTransport, ResourceLaunchHandler, ResourceReleaseHandler,
};
use evaluator_core::evaluator::IdlenessSource;
use evaluator_core::events::{EvaluatorEvent, EvaluatorEventKind, EventHandlerRegistry};
use evaluator_core::protocol::{
    EvaluatorControlMessage, ResourceLaunchEvent, ResourceReleaseEvent,
};
use evaluator_core::scheduler::{ScheduledCallback, Scheduler, SchedulerError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records launch and release requests instead of talking to a resource manager
#[derive(Debug, Default)]
pub struct RecordingResources {
    launches: Mutex<Vec<ResourceLaunchEvent>>,
    releases: Mutex<Vec<ResourceReleaseEvent>>,
}

impl RecordingResources {
    pub fn launches(&self) -> Vec<ResourceLaunchEvent> {
        self.launches.lock().clone()
    }

    pub fn releases(&self) -> Vec<ResourceReleaseEvent> {
        self.releases.lock().clone()
    }

    pub fn release_count(&self, evaluator_id: &str) -> usize {
        self.releases
            .lock()
            .iter()
            .filter(|r| r.evaluator_id == evaluator_id)
            .count()
    }
}

impl ResourceLaunchHandler for RecordingResources {
    fn on_launch(&self, event: ResourceLaunchEvent) {
        self.launches.lock().push(event);
    }
}

impl ResourceReleaseHandler for RecordingResources {
    fn on_release(&self, event: ResourceReleaseEvent) {
        self.releases.lock().push(event);
    }
}

/// Captures control messages with the remote address they were sent to
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, EvaluatorControlMessage)>>,
    broken: AtomicBool,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(String, EvaluatorControlMessage)> {
        self.sent.lock().clone()
    }

    pub fn kill_count(&self) -> usize {
        self.sent.lock().iter().filter(|(_, m)| m.is_kill()).count()
    }

    /// Make every subsequent send fail
    pub fn break_channel(&self) {
        self.broken.store(true, Ordering::Release);
    }
}

impl ControlTransport for RecordingTransport {
    fn send(
        &self,
        remote_id: &str,
        message: &EvaluatorControlMessage,
    ) -> Result<(), ControlError> {
        if self.broken.load(Ordering::Acquire) {
            return Err(ControlError::ChannelClosed {
                channel: remote_id.to_string(),
            });
        }
        self.sent
            .lock()
            .push((remote_id.to_string(), message.clone()));
        Ok(())
    }
}

/// Holds callbacks until the test runs them
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<Vec<(Duration, ScheduledCallback)>>,
}

impl ManualScheduler {
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.pending.lock().iter().map(|(d, _)| *d).collect()
    }

    /// Run everything scheduled so far; returns how many callbacks ran
    pub fn run_all(&self) -> usize {
        let callbacks: Vec<_> = std::mem::take(&mut *self.pending.lock());
        let count = callbacks.len();
        for (_, callback) in callbacks {
            callback();
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(
        &self,
        delay: Duration,
        callback: ScheduledCallback,
    ) -> Result<(), SchedulerError> {
        self.pending.lock().push((delay, callback));
        Ok(())
    }
}

/// A scheduler whose clock is gone
#[derive(Debug, Default)]
pub struct UnavailableScheduler;

impl Scheduler for UnavailableScheduler {
    fn schedule_after(
        &self,
        _delay: Duration,
        _callback: ScheduledCallback,
    ) -> Result<(), SchedulerError> {
        Err(SchedulerError::unavailable("clock torn down"))
    }
}

/// Counts idleness checks
#[derive(Debug, Default)]
pub struct CountingIdleness {
    checks: AtomicUsize,
}

impl CountingIdleness {
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::Acquire)
    }
}

impl IdlenessSource for CountingIdleness {
    fn check(&self) {
        self.checks.fetch_add(1, Ordering::AcqRel);
    }
}

/// Keeps every delivered lifecycle event in order
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<EvaluatorEvent>>>,
}

impl EventRecorder {
    pub fn attach(registry: &EventHandlerRegistry) -> Self {
        let recorder = Self::default();
        let sink = recorder.events.clone();
        registry.register_all("test-recorder", move |event| {
            sink.lock().push(event.clone());
        });
        recorder
    }

    pub fn events(&self) -> Vec<EvaluatorEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EvaluatorEventKind> {
        self.events.lock().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: EvaluatorEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Collects formatted log output for assertions on warnings
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Run `f` with a warn-level subscriber writing into this buffer
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
