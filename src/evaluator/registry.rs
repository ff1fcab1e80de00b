use super::manager::EvaluatorManager;
use crate::error::{EvaluatorError, EvaluatorResult};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// All evaluator managers of a driver, keyed by evaluator id
///
/// Ids are never reused: once an evaluator has been retired its id stays blocked.
/// The retired set therefore holds one id per evaluator the driver has ever closed and
/// grows for the lifetime of the driver.
#[derive(Debug, Default)]
pub struct Evaluators {
    managers: DashMap<String, Arc<EvaluatorManager>>,
    /// Never pruned; pruning would let a late allocation reuse a closed id
    retired: DashSet<String>,
}

impl Evaluators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, manager: Arc<EvaluatorManager>) -> EvaluatorResult<()> {
        let evaluator_id = manager.id().to_string();
        if self.retired.contains(&evaluator_id) {
            return Err(EvaluatorError::DuplicateEvaluator { evaluator_id });
        }
        match self.managers.entry(evaluator_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(EvaluatorError::DuplicateEvaluator { evaluator_id })
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(manager);
                debug!(evaluator_id = %evaluator_id, "Registered evaluator");
                Ok(())
            }
        }
    }

    /// The manager for an id; no map lock is held once this returns
    pub fn get(&self, evaluator_id: &str) -> Option<Arc<EvaluatorManager>> {
        self.managers
            .get(evaluator_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.managers.iter().map(|entry| entry.key().clone()).collect()
    }

    fn snapshot(&self) -> Vec<Arc<EvaluatorManager>> {
        self.managers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Whether every registered evaluator is closed
    pub fn all_closed(&self) -> bool {
        self.snapshot().iter().all(|manager| manager.is_closed())
    }

    /// Drop closed evaluators; returns their ids
    pub fn remove_closed(&self) -> Vec<String> {
        let closed: Vec<String> = self
            .snapshot()
            .into_iter()
            .filter(|manager| manager.is_closed())
            .map(|manager| manager.id().to_string())
            .collect();
        for evaluator_id in &closed {
            self.managers.remove(evaluator_id);
            self.retired.insert(evaluator_id.clone());
        }
        if !closed.is_empty() {
            debug!(removed = closed.len(), "Removed closed evaluators");
        }
        closed
    }

    /// Close every evaluator, e.g. on driver shutdown
    pub fn close_all(&self) {
        let managers = self.snapshot();
        info!(count = managers.len(), "⏹️ Closing all evaluators");
        for manager in managers {
            manager.close();
        }
    }
}
