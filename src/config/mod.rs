//! # Driver Configuration
//!
//! Typed configuration for the evaluator core, loaded from YAML with environment-specific
//! overrides by [`ConfigManager`].
//!
//! ## Layout
//!
//! ```yaml
//! evaluator:
//!   release_grace_period_ms: 100
//!   heartbeat_sanity_check: true
//! restart:
//!   reconciliation_window_ms: 60000
//! events:
//!   publisher_capacity: 1000
//! ```
//!
//! Every field has a default, so partial files are fine.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use evaluator_core::config::ConfigManager;
//!
//! let manager = ConfigManager::load()?;
//! let grace = manager.config().evaluator.release_grace_period();
//! # Ok::<(), evaluator_core::config::ConfigurationError>(())
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::constants::{
    DEFAULT_PUBLISHER_CAPACITY, DEFAULT_RECONCILIATION_WINDOW, DEFAULT_RELEASE_GRACE_PERIOD,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest grace period accepted before a container is released
const MAX_RELEASE_GRACE_PERIOD_MS: u64 = 60_000;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub evaluator: EvaluatorConfig,
    pub restart: RestartConfig,
    pub events: EventsConfig,
}

/// Per-evaluator lifecycle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Delay before returning a closed evaluator's container
    pub release_grace_period_ms: u64,

    /// Warn about heartbeats whose timestamp goes backwards
    pub heartbeat_sanity_check: bool,
}

impl EvaluatorConfig {
    pub fn release_grace_period(&self) -> Duration {
        Duration::from_millis(self.release_grace_period_ms)
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            release_grace_period_ms: DEFAULT_RELEASE_GRACE_PERIOD.as_millis() as u64,
            heartbeat_sanity_check: true,
        }
    }
}

/// Driver restart reconciliation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    /// How long evaluators of a previous attempt get to re-announce themselves
    pub reconciliation_window_ms: u64,
}

impl RestartConfig {
    pub fn reconciliation_window(&self) -> Duration {
        Duration::from_millis(self.reconciliation_window_ms)
    }
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            reconciliation_window_ms: DEFAULT_RECONCILIATION_WINDOW.as_millis() as u64,
        }
    }
}

/// Lifecycle event publishing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub publisher_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            publisher_capacity: DEFAULT_PUBLISHER_CAPACITY,
        }
    }
}

impl DriverConfig {
    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.events.publisher_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.publisher_capacity",
                "0",
                "publisher capacity must be greater than 0",
            ));
        }

        if self.evaluator.release_grace_period_ms > MAX_RELEASE_GRACE_PERIOD_MS {
            return Err(ConfigurationError::invalid_value(
                "evaluator.release_grace_period_ms",
                self.evaluator.release_grace_period_ms.to_string(),
                format!("grace period must not exceed {MAX_RELEASE_GRACE_PERIOD_MS}ms"),
            ));
        }

        Ok(())
    }
}
