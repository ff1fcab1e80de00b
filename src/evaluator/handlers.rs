//! Routing of inbound heartbeats and resource manager status to evaluator managers.

use super::manager::HeartbeatOutcome;
use super::registry::Evaluators;
use crate::error::{EvaluatorError, EvaluatorResult};
use crate::logging;
use crate::protocol::{EvaluatorHeartbeat, RemoteMessage, ResourceStatusEvent};
use std::sync::Arc;
use tracing::{info, warn};

/// Hands heartbeats to the manager of the sending evaluator
#[derive(Debug, Clone)]
pub struct EvaluatorHeartbeatHandler {
    evaluators: Arc<Evaluators>,
}

impl EvaluatorHeartbeatHandler {
    pub fn new(evaluators: Arc<Evaluators>) -> Self {
        Self { evaluators }
    }

    /// Route one heartbeat; expired evaluators are closed on the spot
    pub fn on_heartbeat(
        &self,
        heartbeat: RemoteMessage<EvaluatorHeartbeat>,
    ) -> EvaluatorResult<HeartbeatOutcome> {
        let evaluator_id = heartbeat.message.evaluator_id.clone();
        let Some(manager) = self.evaluators.get(&evaluator_id) else {
            warn!(
                evaluator_id = %evaluator_id,
                sender = %heartbeat.sender,
                "Heartbeat from unknown evaluator"
            );
            return Err(EvaluatorError::UnknownEvaluator { evaluator_id });
        };

        let outcome = manager.on_evaluator_heartbeat(heartbeat).inspect_err(|e| {
            if e.is_fatal() {
                logging::log_error(
                    "evaluator_heartbeat_handler",
                    "on_heartbeat",
                    &e.to_string(),
                    Some(&evaluator_id),
                );
            }
        })?;
        if outcome == HeartbeatOutcome::Expired {
            info!(evaluator_id = %evaluator_id, "Closing expired evaluator");
            manager.close();
        }
        Ok(outcome)
    }
}

/// Hands resource manager status reports to the matching evaluator manager
#[derive(Debug, Clone)]
pub struct ResourceStatusHandler {
    evaluators: Arc<Evaluators>,
}

impl ResourceStatusHandler {
    pub fn new(evaluators: Arc<Evaluators>) -> Self {
        Self { evaluators }
    }

    pub fn on_resource_status(&self, event: ResourceStatusEvent) {
        match self.evaluators.get(&event.evaluator_id) {
            Some(manager) => manager.on_resource_status(event),
            None => warn!(
                evaluator_id = %event.evaluator_id,
                reported = %event.state,
                "Resource status for unknown evaluator"
            ),
        }
    }
}
