#![allow(clippy::doc_markdown)] // Allow technical terms like YARN, JVM in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Evaluator Core
//!
//! Driver-side lifecycle management for evaluators: the remote worker processes a driver
//! obtains from a cluster resource manager.
//!
//! ## Overview
//!
//! A driver asks the resource manager for containers. Each granted container becomes an
//! *evaluator*. The driver launches it, receives periodic heartbeats from it, stacks
//! *contexts* on it, runs at most one *task* at a time inside the innermost context and
//! finally releases the container. This crate owns that reconciliation:
//!
//! - heartbeats, resource manager status reports and user requests are serialized per
//!   evaluator by a single [`EvaluatorManager`]
//! - every transition is surfaced to user code as a typed lifecycle event
//! - a closed evaluator releases its container exactly once and is never reopened
//! - evaluators that survive a driver restart are reconciled within a time window
//!
//! ## Module Organization
//!
//! - [`evaluator`] - Per-evaluator manager, user handles, routing and the registry
//! - [`context`] - Context stack bookkeeping
//! - [`events`] - Lifecycle event types, per-evaluator dispatch and publishing
//! - [`protocol`] - Heartbeat, control and resource manager message types
//! - [`control`] - Outbound control and resource channels
//! - [`restart`] - Driver restart reconciliation
//! - [`state_machine`] - Evaluator, reported and restart state enums
//! - [`scheduler`] - Delayed work for the container release grace period
//! - [`codec`] - Decoding of remote failure payloads
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evaluator_core::config::ConfigManager;
//! use evaluator_core::control::{MpscControlTransport, ResourceRequestChannel};
//! use evaluator_core::evaluator::{
//!     DriverServices, EvaluatorDescriptor, EvaluatorHeartbeatHandler, EvaluatorIdlenessSource,
//!     EvaluatorManagerFactory, Evaluators, NodeDescriptor,
//! };
//! use evaluator_core::events::{EvaluatorEventKind, EventHandlerRegistry, EventPublisher};
//! use evaluator_core::restart::DriverRestartManager;
//! use evaluator_core::scheduler::TokioScheduler;
//! use evaluator_core::codec::JsonExceptionCodec;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! evaluator_core::logging::init_structured_logging();
//! let config = ConfigManager::load()?;
//!
//! let handlers = Arc::new(EventHandlerRegistry::new());
//! handlers.register(EvaluatorEventKind::EvaluatorAllocated, "launcher", |event| {
//!     println!("allocated: {}", event.evaluator_id());
//! });
//!
//! let evaluators = Arc::new(Evaluators::new());
//! let (transport, _outbound) = MpscControlTransport::new();
//! let (resources, _requests) = ResourceRequestChannel::new();
//! let resources = Arc::new(resources);
//!
//! let services = DriverServices {
//!     driver_remote_id: "driver@10.0.0.1:9000".to_string(),
//!     handlers,
//!     publisher: Some(EventPublisher::new(config.config().events.publisher_capacity)),
//!     transport: Arc::new(transport),
//!     launch_handler: resources.clone(),
//!     release_handler: resources,
//!     restart: Arc::new(DriverRestartManager::new()),
//!     codec: Arc::new(JsonExceptionCodec),
//!     scheduler: Arc::new(TokioScheduler::current()?),
//!     idleness: Arc::new(EvaluatorIdlenessSource::new(&evaluators)),
//! };
//! let factory = EvaluatorManagerFactory::new(services, &config.config().evaluator);
//!
//! let node = NodeDescriptor::new("node-1", "10.0.0.2", 8042);
//! let manager = factory.create("eval-1", EvaluatorDescriptor::new(node, 4096, 2, "jvm"));
//! evaluators.put(manager.clone())?;
//! manager.fire_allocated_event();
//!
//! let _router = EvaluatorHeartbeatHandler::new(evaluators);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod codec;
pub mod config;
pub mod constants;
pub mod context;
pub mod control;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod logging;
pub mod protocol;
pub mod restart;
pub mod scheduler;
pub mod state_machine;

pub use config::{ConfigManager, ConfigurationError, DriverConfig};
pub use error::{EvaluatorError, EvaluatorException, EvaluatorFailureKind, EvaluatorResult};
pub use evaluator::{
    ActiveContext, AllocatedEvaluator, EvaluatorDescriptor, EvaluatorManager,
    EvaluatorManagerFactory, Evaluators, HeartbeatOutcome, RunningTask,
};
pub use events::{EvaluatorEvent, EvaluatorEventKind, EventHandlerRegistry, EventPublisher};
pub use state_machine::{EvaluatorState, ReportedState, RestartState};
