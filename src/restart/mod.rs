//! # Driver Restart Reconciliation
//!
//! After the driver process restarts, evaluators from the previous attempt may still be
//! alive. They are recorded as `Reported` and given a reconciliation window to send a
//! heartbeat. Those that do become `Reregistered`; those that do not are `Expired` and
//! will be closed if they ever show up later.

use crate::scheduler::{Scheduler, SchedulerError};
use crate::state_machine::RestartState;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read and update access to per-evaluator restart state
pub trait RestartStateSource: Send + Sync {
    /// Restart state of an evaluator; unknown ids are `NotRestarted`
    fn restart_state(&self, evaluator_id: &str) -> RestartState;

    /// Record that an evaluator from the previous attempt re-announced itself
    fn mark_reregistered(&self, evaluator_id: &str);
}

/// In-memory restart reconciler
#[derive(Debug, Default)]
pub struct DriverRestartManager {
    states: DashMap<String, RestartState>,
}

impl DriverRestartManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the evaluators that were alive before the driver restarted
    pub fn on_driver_restart<I, S>(&self, previous_evaluators: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut count = 0;
        for evaluator_id in previous_evaluators {
            self.states.insert(evaluator_id.into(), RestartState::Reported);
            count += 1;
        }
        info!(
            reported_evaluators = count,
            "🔄 Driver restart: awaiting evaluator re-registration"
        );
        count
    }

    /// Mark an evaluator as failed during reconciliation
    pub fn mark_failed_or_expired(&self, evaluator_id: &str) {
        self.states
            .insert(evaluator_id.to_string(), RestartState::FailedOrExpired);
        debug!(evaluator_id = %evaluator_id, "Evaluator marked failed or expired");
    }

    /// Expire every evaluator that has not re-announced itself; returns their ids
    pub fn expire_unreported(&self) -> Vec<String> {
        let mut expired = Vec::new();
        for mut entry in self.states.iter_mut() {
            if *entry.value() == RestartState::Reported {
                *entry.value_mut() = RestartState::Expired;
                expired.push(entry.key().clone());
            }
        }
        if !expired.is_empty() {
            warn!(
                expired_count = expired.len(),
                evaluators = ?expired,
                "⏰ Reconciliation window closed with unreported evaluators"
            );
        }
        expired
    }

    /// Schedule [`expire_unreported`](Self::expire_unreported) once the window closes
    pub fn schedule_reconciliation_expiry(
        self: &Arc<Self>,
        scheduler: &dyn Scheduler,
        window: Duration,
    ) -> Result<(), SchedulerError> {
        let manager = Arc::clone(self);
        scheduler.schedule_after(
            window,
            Box::new(move || {
                manager.expire_unreported();
            }),
        )
    }

    /// Whether any evaluator is still expected to re-announce itself
    pub fn is_reconciling(&self) -> bool {
        self.states
            .iter()
            .any(|entry| *entry.value() == RestartState::Reported)
    }
}

impl RestartStateSource for DriverRestartManager {
    fn restart_state(&self, evaluator_id: &str) -> RestartState {
        self.states
            .get(evaluator_id)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    fn mark_reregistered(&self, evaluator_id: &str) {
        match self.states.get_mut(evaluator_id) {
            Some(mut entry) if *entry.value() == RestartState::Reported => {
                *entry.value_mut() = RestartState::Reregistered;
                info!(evaluator_id = %evaluator_id, "✅ Evaluator re-registered after driver restart");
            }
            Some(entry) => warn!(
                evaluator_id = %evaluator_id,
                restart_state = %entry.value(),
                "Ignoring re-registration outside the reported state"
            ),
            None => warn!(
                evaluator_id = %evaluator_id,
                "Ignoring re-registration of an evaluator unknown to the previous attempt"
            ),
        }
    }
}
