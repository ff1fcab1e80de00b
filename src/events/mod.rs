pub mod dispatcher;
pub mod publisher;
pub mod registry;
pub mod types;

// Re-export key types for convenience
pub use dispatcher::{EvaluatorEventDispatcher, EvaluatorMessageDispatcher};
pub use publisher::{EventPublisher, PublishedEvent};
pub use registry::{EventHandler, EventHandlerRegistry};
pub use types::{
    ClosedContext, CompletedEvaluator, CompletedTask, ContextMessage, EvaluatorEvent,
    EvaluatorEventKind, FailedContext, FailedEvaluator, FailedTask, SuspendedTask, TaskMessage,
};
