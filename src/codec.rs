//! # Exception Codec
//!
//! Evaluators ship failures as opaque byte payloads. The codec turns those payloads back
//! into a [`RemoteException`] when it can. A payload that cannot be decoded is not an
//! error for the driver: callers substitute a generic exception instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// An exception raised inside a remote evaluator or task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteException {
    /// Fully-qualified type name on the remote side
    pub class_name: String,

    /// Human-readable message
    pub message: String,

    /// Remote stack frames, innermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_trace: Vec<String>,

    /// Nested cause, if the remote runtime reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<RemoteException>>,
}

impl RemoteException {
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
            stack_trace: Vec::new(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: RemoteException) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// The innermost cause in the chain
    pub fn root_cause(&self) -> &RemoteException {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }
}

impl fmt::Display for RemoteException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class_name, self.message)
    }
}

/// Decodes failure payloads sent by evaluators
pub trait ExceptionCodec: Send + Sync {
    /// Decode a payload, returning `None` if it is not a recognizable exception
    fn decode(&self, bytes: &[u8]) -> Option<RemoteException>;

    /// Encode an exception the way evaluators are expected to send it
    fn encode(&self, exception: &RemoteException) -> Vec<u8>;
}

/// JSON payload codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExceptionCodec;

impl ExceptionCodec for JsonExceptionCodec {
    fn decode(&self, bytes: &[u8]) -> Option<RemoteException> {
        match serde_json::from_slice(bytes) {
            Ok(exception) => Some(exception),
            Err(e) => {
                debug!(error = %e, payload_len = bytes.len(), "Unable to decode exception payload");
                None
            }
        }
    }

    fn encode(&self, exception: &RemoteException) -> Vec<u8> {
        // Serializing plain strings and vectors cannot fail
        serde_json::to_vec(exception).unwrap_or_default()
    }
}
