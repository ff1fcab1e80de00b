//! # Wire Protocol
//!
//! Message types crossing the driver boundary: heartbeats from evaluators, control
//! messages to evaluators and launch/release/status events with the resource manager.
//! All types are serde-serializable; payload bytes are opaque to this crate.

pub mod control;
pub mod heartbeat;
pub mod resource;

pub use control::{ContextControlMessage, ControlPayload, EvaluatorControlMessage};
pub use heartbeat::{
    ContextState, ContextStatus, EvaluatorHeartbeat, EvaluatorStatus, RemoteMessage,
    SourcedMessage, TaskStatus,
};
pub use resource::{ResourceLaunchEvent, ResourceReleaseEvent, ResourceStatusEvent};
