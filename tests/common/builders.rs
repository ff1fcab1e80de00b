use super::fakes::*;
use evaluator_core::codec::JsonExceptionCodec;
use evaluator_core::config::EvaluatorConfig;
use evaluator_core::error::EvaluatorResult;
use evaluator_core::evaluator::{
    DriverServices, EvaluatorDescriptor, EvaluatorHeartbeatHandler, EvaluatorIdlenessSource,
    EvaluatorManager, EvaluatorManagerFactory, EvaluatorProcess, Evaluators, HeartbeatOutcome,
    IdlenessSource, NodeDescriptor,
};
use evaluator_core::events::{EventHandlerRegistry, EventPublisher};
use evaluator_core::protocol::{
    ContextState, ContextStatus, EvaluatorHeartbeat, RemoteMessage, ResourceLaunchEvent,
};
use evaluator_core::restart::DriverRestartManager;
use evaluator_core::scheduler::Scheduler;
use std::sync::Arc;

pub const DRIVER_REMOTE_ID: &str = "driver@127.0.0.1:9000";
pub const ROOT_CONTEXT: &str = "root";

pub fn remote_id(evaluator_id: &str) -> String {
    format!("{evaluator_id}@127.0.0.1:7001")
}

pub fn descriptor() -> EvaluatorDescriptor {
    EvaluatorDescriptor::new(NodeDescriptor::new("node-1", "10.0.0.2", 8042), 2048, 2, "jvm")
}

pub fn launch_event(evaluator_id: &str) -> ResourceLaunchEvent {
    ResourceLaunchEvent {
        evaluator_id: evaluator_id.to_string(),
        driver_remote_id: DRIVER_REMOTE_ID.to_string(),
        process: EvaluatorProcess::default(),
        context_configuration: "root-context".to_string(),
        task_configuration: None,
    }
}

/// A heartbeat carrying the root context as ready
pub fn root_context_heartbeat(evaluator_id: &str, timestamp: i64) -> EvaluatorHeartbeat {
    EvaluatorHeartbeat::new(evaluator_id, timestamp)
        .with_context_status(ContextStatus::new(ROOT_CONTEXT, ContextState::Ready))
}

pub struct TestDriverBuilder {
    scheduler: Option<Arc<dyn Scheduler>>,
    real_idleness: bool,
    config: EvaluatorConfig,
    publisher: Option<EventPublisher>,
}

impl Default for TestDriverBuilder {
    fn default() -> Self {
        Self {
            scheduler: None,
            real_idleness: false,
            config: EvaluatorConfig::default(),
            publisher: None,
        }
    }
}

impl TestDriverBuilder {
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Use the registry-backed idleness source instead of the counting fake
    pub fn real_idleness(mut self) -> Self {
        self.real_idleness = true;
        self
    }

    pub fn publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TestDriver {
        let handlers = Arc::new(EventHandlerRegistry::new());
        let recorder = EventRecorder::attach(&handlers);
        let resources = Arc::new(RecordingResources::default());
        let transport = Arc::new(RecordingTransport::default());
        let restart = Arc::new(DriverRestartManager::new());
        let manual_scheduler = Arc::new(ManualScheduler::default());
        let counting_idleness = Arc::new(CountingIdleness::default());
        let evaluators = Arc::new(Evaluators::new());
        let idle_source = self
            .real_idleness
            .then(|| Arc::new(EvaluatorIdlenessSource::new(&evaluators)));

        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => manual_scheduler.clone(),
        };
        let idleness: Arc<dyn IdlenessSource> = match &idle_source {
            Some(source) => source.clone(),
            None => counting_idleness.clone(),
        };

        let services = DriverServices {
            driver_remote_id: DRIVER_REMOTE_ID.to_string(),
            handlers: handlers.clone(),
            publisher: self.publisher,
            transport: transport.clone(),
            launch_handler: resources.clone(),
            release_handler: resources.clone(),
            restart: restart.clone(),
            codec: Arc::new(JsonExceptionCodec),
            scheduler,
            idleness,
        };

        TestDriver {
            factory: EvaluatorManagerFactory::new(services, &self.config),
            handlers,
            recorder,
            resources,
            transport,
            restart,
            scheduler: manual_scheduler,
            idleness: counting_idleness,
            idle_source,
            evaluators,
        }
    }
}

/// A driver wired to recording fakes
pub struct TestDriver {
    factory: EvaluatorManagerFactory,
    pub handlers: Arc<EventHandlerRegistry>,
    pub recorder: EventRecorder,
    pub resources: Arc<RecordingResources>,
    pub transport: Arc<RecordingTransport>,
    pub restart: Arc<DriverRestartManager>,
    pub scheduler: Arc<ManualScheduler>,
    pub idleness: Arc<CountingIdleness>,
    pub idle_source: Option<Arc<EvaluatorIdlenessSource>>,
    pub evaluators: Arc<Evaluators>,
}

impl TestDriver {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TestDriverBuilder {
        TestDriverBuilder::default()
    }

    pub fn router(&self) -> EvaluatorHeartbeatHandler {
        EvaluatorHeartbeatHandler::new(self.evaluators.clone())
    }

    /// Build a manager the registry does not know about
    pub fn create_unregistered(&self, evaluator_id: &str) -> Arc<EvaluatorManager> {
        self.factory.create(evaluator_id, descriptor())
    }

    /// Create and register a manager without firing any event
    pub fn create(&self, evaluator_id: &str) -> Arc<EvaluatorManager> {
        let manager = self.factory.create(evaluator_id, descriptor());
        self.evaluators
            .put(manager.clone())
            .expect("evaluator ids are unique per test");
        manager
    }

    /// Create, register and announce an evaluator
    pub fn allocate(&self, evaluator_id: &str) -> Arc<EvaluatorManager> {
        let manager = self.create(evaluator_id);
        manager.fire_allocated_event();
        manager
    }

    /// Allocate and launch an evaluator, then deliver its first heartbeat
    pub fn running(&self, evaluator_id: &str) -> Arc<EvaluatorManager> {
        let manager = self.allocate(evaluator_id);
        manager
            .on_resource_launch(launch_event(evaluator_id))
            .expect("launch from allocated");
        let outcome = self
            .heartbeat(&manager, root_context_heartbeat(evaluator_id, 1))
            .expect("first heartbeat");
        assert_eq!(outcome, HeartbeatOutcome::Processed);
        manager
    }

    pub fn heartbeat(
        &self,
        manager: &EvaluatorManager,
        heartbeat: EvaluatorHeartbeat,
    ) -> EvaluatorResult<HeartbeatOutcome> {
        manager.on_evaluator_heartbeat(RemoteMessage::new(remote_id(manager.id()), heartbeat))
    }
}
