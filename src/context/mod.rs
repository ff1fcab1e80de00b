//! # Context Registry
//!
//! Tracks the stack of execution contexts living on one evaluator. Context status reports
//! arrive with every heartbeat; the registry turns changes into context lifecycle events.
//!
//! ## Status handling
//!
//! | Known? | Reported | Effect |
//! |---|---|---|
//! | no  | `Ready` | context added, active event when new contexts are announced |
//! | yes | `Ready` | carried messages forwarded |
//! | any | `Done`  | context removed, closed event |
//! | any | `Fail`  | context removed, failed event |

use crate::codec::ExceptionCodec;
use crate::constants::messages;
use crate::error::{EvaluatorError, EvaluatorResult};
use crate::evaluator::{ActiveContext, EvaluatorLink};
use crate::events::{ClosedContext, ContextMessage, EvaluatorEventDispatcher, FailedContext};
use crate::protocol::{ContextState, ContextStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Context bookkeeping consumed by the evaluator manager
pub trait ContextRegistry: Send + Sync {
    /// Apply the context part of a heartbeat
    fn on_context_status_messages(
        &self,
        statuses: &[ContextStatus],
        notify_new: bool,
    ) -> EvaluatorResult<()>;

    /// Tear down every live context because the evaluator died; innermost first
    fn failed_contexts_for_evaluator_failure(&self) -> Vec<FailedContext>;

    fn get_context(&self, context_id: &str) -> Option<ActiveContext>;
}

/// Context registry of a single evaluator
pub struct ContextRepresenters {
    link: Arc<EvaluatorLink>,
    dispatcher: Arc<dyn EvaluatorEventDispatcher>,
    codec: Arc<dyn ExceptionCodec>,
    /// Live contexts, root first
    contexts: Mutex<Vec<ActiveContext>>,
}

impl ContextRepresenters {
    pub fn new(
        link: Arc<EvaluatorLink>,
        dispatcher: Arc<dyn EvaluatorEventDispatcher>,
        codec: Arc<dyn ExceptionCodec>,
    ) -> Self {
        Self {
            link,
            dispatcher,
            codec,
            contexts: Mutex::new(Vec::new()),
        }
    }

    fn evaluator_id(&self) -> &str {
        self.link.evaluator_id()
    }

    /// Ids of live contexts, root first
    pub fn context_ids(&self) -> Vec<String> {
        self.contexts
            .lock()
            .iter()
            .map(|c| c.id().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.lock().is_empty()
    }

    fn on_context_status(
        &self,
        contexts: &mut Vec<ActiveContext>,
        status: &ContextStatus,
        notify_new: bool,
    ) -> EvaluatorResult<()> {
        let position = contexts.iter().position(|c| c.id() == status.context_id);

        match (position, status.state) {
            (None, ContextState::Ready) => {
                if let Some(parent_id) = &status.parent_id {
                    if !contexts.iter().any(|c| c.id() == parent_id) {
                        warn!(
                            evaluator_id = %self.evaluator_id(),
                            context_id = %status.context_id,
                            parent_id = %parent_id,
                            "New context reports an unknown parent"
                        );
                    }
                }
                let context = ActiveContext::new(
                    status.context_id.clone(),
                    status.parent_id.clone(),
                    Arc::clone(&self.link),
                );
                debug!(
                    evaluator_id = %self.evaluator_id(),
                    context_id = %status.context_id,
                    notify = notify_new,
                    "Context became active"
                );
                contexts.push(context.clone());
                if notify_new {
                    self.dispatcher.on_context_active(context);
                }
                self.forward_messages(status);
            }
            (Some(_), ContextState::Ready) => self.forward_messages(status),
            (position, ContextState::Done) => {
                self.forward_messages(status);
                if let Some(index) = position {
                    contexts.remove(index);
                }
                debug!(
                    evaluator_id = %self.evaluator_id(),
                    context_id = %status.context_id,
                    "Context closed"
                );
                self.dispatcher.on_context_closed(ClosedContext {
                    context_id: status.context_id.clone(),
                    evaluator_id: self.evaluator_id().to_string(),
                    parent_context: self.parent_of(contexts, status)?,
                });
            }
            (position, ContextState::Fail) => {
                self.forward_messages(status);
                if let Some(index) = position {
                    contexts.remove(index);
                }
                let cause = status.error.as_deref().and_then(|e| self.codec.decode(e));
                let message = cause
                    .as_ref()
                    .map(|c| c.message.clone())
                    .unwrap_or_else(|| messages::TASK_FAILURE_NO_MESSAGE.to_string());
                warn!(
                    evaluator_id = %self.evaluator_id(),
                    context_id = %status.context_id,
                    message = %message,
                    "❌ Context failed"
                );
                self.dispatcher.on_context_failed(FailedContext {
                    context_id: status.context_id.clone(),
                    evaluator_id: self.evaluator_id().to_string(),
                    message,
                    description: cause.as_ref().map(|c| c.to_string()),
                    cause,
                    parent_context: self.parent_of(contexts, status)?,
                });
            }
        }
        Ok(())
    }

    fn parent_of(
        &self,
        contexts: &[ActiveContext],
        status: &ContextStatus,
    ) -> EvaluatorResult<Option<ActiveContext>> {
        let Some(parent_id) = &status.parent_id else {
            return Ok(None);
        };
        contexts
            .iter()
            .find(|c| c.id() == parent_id)
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                EvaluatorError::protocol_violation(
                    self.evaluator_id(),
                    format!(
                        "context {} closed on top of unknown parent {}",
                        status.context_id, parent_id
                    ),
                )
            })
    }

    fn forward_messages(&self, status: &ContextStatus) {
        for message in &status.messages {
            self.dispatcher.on_context_message(ContextMessage {
                context_id: status.context_id.clone(),
                evaluator_id: self.evaluator_id().to_string(),
                source_id: message.source_id.clone(),
                message: message.message.clone(),
            });
        }
    }
}

impl ContextRegistry for ContextRepresenters {
    fn on_context_status_messages(
        &self,
        statuses: &[ContextStatus],
        notify_new: bool,
    ) -> EvaluatorResult<()> {
        let mut contexts = self.contexts.lock();
        for status in statuses {
            self.on_context_status(&mut contexts, status, notify_new)?;
        }
        Ok(())
    }

    fn failed_contexts_for_evaluator_failure(&self) -> Vec<FailedContext> {
        let mut contexts = self.contexts.lock();
        let failed: Vec<FailedContext> = contexts
            .iter()
            .rev()
            .map(|context| FailedContext {
                context_id: context.id().to_string(),
                evaluator_id: self.evaluator_id().to_string(),
                message: messages::CONTEXT_EVALUATOR_FAILURE.to_string(),
                description: None,
                cause: None,
                parent_context: None,
            })
            .collect();
        contexts.clear();
        failed
    }

    fn get_context(&self, context_id: &str) -> Option<ActiveContext> {
        self.contexts
            .lock()
            .iter()
            .find(|c| c.id() == context_id)
            .cloned()
    }
}

impl std::fmt::Debug for ContextRepresenters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRepresenters")
            .field("evaluator_id", &self.evaluator_id())
            .field("contexts", &self.context_ids())
            .finish()
    }
}
