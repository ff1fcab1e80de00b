//! # Control Channels
//!
//! One-way push channels out of the driver:
//!
//! - [`EvaluatorControlHandler`] sends control messages to a single remote evaluator over a
//!   pluggable [`ControlTransport`].
//! - [`ResourceLaunchHandler`] and [`ResourceReleaseHandler`] forward launch and release
//!   requests to the cluster resource manager.
//!
//! Nothing here waits for acknowledgments. Reliability belongs to the transport.

mod handler;
mod resource;
mod transport;

pub use handler::EvaluatorControlHandler;
pub use resource::{
    ResourceLaunchHandler, ResourceReleaseHandler, ResourceRequest, ResourceRequestChannel,
};
pub use transport::{ControlTransport, MpscControlTransport, OutboundControl};

/// Errors raised while pushing control messages
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The evaluator has not sent a heartbeat yet, so we do not know where it lives
    #[error("No remote address bound for evaluator {evaluator_id}")]
    RemoteNotBound { evaluator_id: String },

    #[error("Channel closed: {channel}")]
    ChannelClosed { channel: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ControlResult<T> = std::result::Result<T, ControlError>;
