use super::manager::EvaluatorManager;
use crate::error::{EvaluatorError, EvaluatorResult};
use std::sync::{Arc, OnceLock, Weak};
use tracing::warn;

/// Weak back-reference from user handles to the manager that owns them
///
/// Created before the manager so the manager's collaborators can hand out handles, then
/// bound once the manager lives in an `Arc`.
#[derive(Debug)]
pub struct EvaluatorLink {
    evaluator_id: String,
    manager: OnceLock<Weak<EvaluatorManager>>,
}

impl EvaluatorLink {
    pub fn new(evaluator_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            evaluator_id: evaluator_id.into(),
            manager: OnceLock::new(),
        })
    }

    pub fn evaluator_id(&self) -> &str {
        &self.evaluator_id
    }

    pub fn bind(&self, manager: &Arc<EvaluatorManager>) {
        if self.manager.set(Arc::downgrade(manager)).is_err() {
            warn!(evaluator_id = %self.evaluator_id, "Evaluator link already bound");
        }
    }

    /// The owning manager, or `EvaluatorGone` once it has been dropped
    pub fn manager(&self) -> EvaluatorResult<Arc<EvaluatorManager>> {
        self.manager
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| EvaluatorError::EvaluatorGone {
                evaluator_id: self.evaluator_id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_link_reports_gone() {
        let link = EvaluatorLink::new("eval-1");
        assert_eq!(link.evaluator_id(), "eval-1");
        assert!(matches!(
            link.manager(),
            Err(EvaluatorError::EvaluatorGone { .. })
        ));
    }
}
