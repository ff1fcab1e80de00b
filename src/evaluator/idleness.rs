use super::registry::Evaluators;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::{debug, info};

/// Told whenever an evaluator closes, so the driver can notice it has nothing left to do
pub trait IdlenessSource: Send + Sync {
    fn check(&self);
}

/// Reports the driver idle once every registered evaluator is closed
#[derive(Debug)]
pub struct EvaluatorIdlenessSource {
    evaluators: Weak<Evaluators>,
    idle: AtomicBool,
    notify: Notify,
}

impl EvaluatorIdlenessSource {
    pub fn new(evaluators: &Arc<Evaluators>) -> Self {
        Self {
            evaluators: Arc::downgrade(evaluators),
            idle: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Whether every registered evaluator is closed right now
    pub fn is_idle(&self) -> bool {
        self.evaluators
            .upgrade()
            .map_or(true, |evaluators| evaluators.all_closed())
    }

    /// Wait until a check finds the driver idle
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl IdlenessSource for EvaluatorIdlenessSource {
    fn check(&self) {
        if self.is_idle() {
            if !self.idle.swap(true, Ordering::AcqRel) {
                info!("💤 All evaluators closed; driver is idle");
            }
            self.notify.notify_waiters();
        } else {
            if self.idle.swap(false, Ordering::AcqRel) {
                debug!("Driver no longer idle");
            }
            debug!("Idleness check: evaluators still open");
        }
    }
}
