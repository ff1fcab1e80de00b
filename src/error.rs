//! # Error Types
//!
//! Two kinds of failure flow through the evaluator core:
//!
//! - **Fatal** errors ([`EvaluatorError::ProtocolViolation`]) mean the driver observed an
//!   ordering that must never happen. The host is expected to treat them as crash-worthy.
//! - **Degraded** failures ([`EvaluatorException`]) describe an evaluator that died. They are
//!   never returned as `Err` from the processing path; they travel inside a
//!   [`FailedEvaluator`](crate::events::FailedEvaluator) event instead.

use crate::codec::RemoteException;
use crate::control::ControlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors surfaced by evaluator lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    /// Unexpected message ordering from the remote evaluator or an upstream caller
    #[error("Protocol violation for evaluator {evaluator_id}: {message}")]
    ProtocolViolation {
        evaluator_id: String,
        message: String,
    },

    /// A message arrived for an evaluator the driver does not track
    #[error("Unknown evaluator: {evaluator_id}")]
    UnknownEvaluator { evaluator_id: String },

    /// An evaluator id was registered twice
    #[error("Evaluator {evaluator_id} is already registered")]
    DuplicateEvaluator { evaluator_id: String },

    /// The evaluator process configuration can only be set once
    #[error("Process for evaluator {evaluator_id} has already been set")]
    ProcessAlreadySet { evaluator_id: String },

    /// A handle outlived the manager it points to
    #[error("Evaluator {evaluator_id} is no longer managed by this driver")]
    EvaluatorGone { evaluator_id: String },

    /// Sending a control message failed
    #[error("Control channel error: {0}")]
    Control(#[from] ControlError),
}

impl EvaluatorError {
    /// Create a protocol violation error
    pub fn protocol_violation(evaluator_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            evaluator_id: evaluator_id.into(),
            message: message.into(),
        }
    }

    /// Whether the host process must treat this error as a crash
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }
}

pub type EvaluatorResult<T> = std::result::Result<T, EvaluatorError>;

/// Distinguishes externally-initiated kills from opaque crashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorFailureKind {
    /// The evaluator crashed or reported a failure
    Crash,
    /// The resource manager killed the container
    KilledByResourceManager,
}

impl fmt::Display for EvaluatorFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crash => write!(f, "crash"),
            Self::KilledByResourceManager => write!(f, "killed_by_resource_manager"),
        }
    }
}

/// Failure of a remote evaluator, delivered to users as part of a failure event
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Evaluator {evaluator_id} failed ({kind}): {message}")]
pub struct EvaluatorException {
    evaluator_id: String,
    kind: EvaluatorFailureKind,
    message: String,
    cause: Option<RemoteException>,
}

impl EvaluatorException {
    /// Generic evaluator failure with a message
    pub fn new(evaluator_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            kind: EvaluatorFailureKind::Crash,
            message: message.into(),
            cause: None,
        }
    }

    /// Failure caused by an exception the evaluator reported and we decoded
    pub fn with_cause(evaluator_id: impl Into<String>, cause: RemoteException) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            kind: EvaluatorFailureKind::Crash,
            message: cause.message.clone(),
            cause: Some(cause),
        }
    }

    /// The resource manager killed the container underneath a live evaluator
    pub fn killed_by_resource_manager(
        evaluator_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            kind: EvaluatorFailureKind::KilledByResourceManager,
            message: message.into(),
            cause: None,
        }
    }

    pub fn evaluator_id(&self) -> &str {
        &self.evaluator_id
    }

    pub fn kind(&self) -> EvaluatorFailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&RemoteException> {
        self.cause.as_ref()
    }

    pub fn is_killed_by_resource_manager(&self) -> bool {
        self.kind == EvaluatorFailureKind::KilledByResourceManager
    }
}
