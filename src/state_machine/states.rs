use serde::{Deserialize, Serialize};
use std::fmt;

/// Driver-side lifecycle state of an evaluator
///
/// States only move forward: `Allocated → Submitted → Running → {Done | Failed | Killed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorState {
    /// Container granted by the resource manager, nothing launched yet
    Allocated,
    /// Launch request forwarded to the resource manager
    Submitted,
    /// Evaluator has sent its first heartbeat
    Running,
    /// Evaluator shut down cleanly
    Done,
    /// Evaluator crashed or was lost
    Failed,
    /// Evaluator was shut down by the driver
    Killed,
}

impl EvaluatorState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Killed)
    }

    /// Check if the evaluator is still considered alive
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for EvaluatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocated => write!(f, "ALLOCATED"),
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
            Self::Killed => write!(f, "KILLED"),
        }
    }
}

impl Default for EvaluatorState {
    fn default() -> Self {
        Self::Allocated
    }
}

/// State carried in status messages from evaluators and the resource manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedState {
    Init,
    Running,
    Suspend,
    Done,
    Failed,
    Killed,
}

impl ReportedState {
    /// Check if the reported state means the reporting entity is gone
    pub fn is_done_or_failed_or_killed(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Killed)
    }
}

impl fmt::Display for ReportedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::Running => write!(f, "RUNNING"),
            Self::Suspend => write!(f, "SUSPEND"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
            Self::Killed => write!(f, "KILLED"),
        }
    }
}

impl std::str::FromStr for ReportedState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INIT" => Ok(Self::Init),
            "RUNNING" => Ok(Self::Running),
            "SUSPEND" => Ok(Self::Suspend),
            "DONE" => Ok(Self::Done),
            "FAILED" => Ok(Self::Failed),
            "KILLED" => Ok(Self::Killed),
            _ => Err(format!("Invalid reported state: {s}")),
        }
    }
}

/// Reconciliation state of an evaluator across a driver restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartState {
    /// The evaluator was not part of a previous driver attempt
    NotRestarted,
    /// The driver restarted and expects this evaluator to re-announce itself
    Reported,
    /// The evaluator re-announced itself after the restart
    Reregistered,
    /// The reconciliation window closed without a re-announcement
    Expired,
    /// The evaluator failed or expired during reconciliation
    FailedOrExpired,
}

impl RestartState {
    /// Failures of evaluators in these states go to the driver-restart failure sink
    pub fn is_failed_or_expired(&self) -> bool {
        matches!(self, Self::Expired | Self::FailedOrExpired)
    }

    /// Check if the evaluator belongs to a previous driver attempt
    pub fn is_from_previous_attempt(&self) -> bool {
        !matches!(self, Self::NotRestarted)
    }
}

impl fmt::Display for RestartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRestarted => write!(f, "not_restarted"),
            Self::Reported => write!(f, "reported"),
            Self::Reregistered => write!(f, "reregistered"),
            Self::Expired => write!(f, "expired"),
            Self::FailedOrExpired => write!(f, "failed_or_expired"),
        }
    }
}

impl Default for RestartState {
    fn default() -> Self {
        Self::NotRestarted
    }
}
