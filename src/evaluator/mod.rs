//! # Evaluator Lifecycle
//!
//! The per-evaluator lifecycle manager and everything built around it:
//!
//! - [`EvaluatorManager`] reconciles heartbeats, resource manager status and user requests
//!   into one lifecycle per evaluator.
//! - [`TaskRepresenter`] follows the single task running on an evaluator.
//! - [`HeartbeatSanityChecker`] flags heartbeats that go back in time.
//! - [`AllocatedEvaluator`], [`ActiveContext`] and [`RunningTask`] are the handles users
//!   receive in lifecycle events.
//! - [`Evaluators`], [`EvaluatorHeartbeatHandler`] and [`ResourceStatusHandler`] route
//!   inbound traffic to the right manager; [`EvaluatorManagerFactory`] assembles managers.

mod allocated;
mod descriptor;
mod factory;
mod handlers;
mod handles;
mod idleness;
mod link;
mod manager;
mod registry;
mod sanity;
mod task;

pub use allocated::AllocatedEvaluator;
pub use descriptor::{EvaluatorDescriptor, EvaluatorProcess, NodeDescriptor};
pub use factory::{DriverServices, EvaluatorManagerFactory};
pub use handlers::{EvaluatorHeartbeatHandler, ResourceStatusHandler};
pub use handles::{ActiveContext, RunningTask};
pub use idleness::{EvaluatorIdlenessSource, IdlenessSource};
pub use link::EvaluatorLink;
pub use manager::{EvaluatorManager, HeartbeatOutcome, ManagerCollaborators};
pub use registry::Evaluators;
pub use sanity::HeartbeatSanityChecker;
pub use task::TaskRepresenter;
