use super::descriptor::EvaluatorDescriptor;
use super::idleness::IdlenessSource;
use super::link::EvaluatorLink;
use super::manager::{EvaluatorManager, ManagerCollaborators};
use super::sanity::HeartbeatSanityChecker;
use crate::codec::ExceptionCodec;
use crate::config::EvaluatorConfig;
use crate::context::ContextRepresenters;
use crate::control::{
    ControlTransport, EvaluatorControlHandler, ResourceLaunchHandler, ResourceReleaseHandler,
};
use crate::events::{
    EvaluatorEventDispatcher, EvaluatorMessageDispatcher, EventHandlerRegistry, EventPublisher,
};
use crate::restart::RestartStateSource;
use crate::scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Driver-wide collaborators shared by every evaluator
#[derive(Clone)]
pub struct DriverServices {
    /// Transport address evaluators use to reach the driver
    pub driver_remote_id: String,
    pub handlers: Arc<EventHandlerRegistry>,
    pub publisher: Option<EventPublisher>,
    pub transport: Arc<dyn ControlTransport>,
    pub launch_handler: Arc<dyn ResourceLaunchHandler>,
    pub release_handler: Arc<dyn ResourceReleaseHandler>,
    pub restart: Arc<dyn RestartStateSource>,
    pub codec: Arc<dyn ExceptionCodec>,
    pub scheduler: Arc<dyn Scheduler>,
    pub idleness: Arc<dyn IdlenessSource>,
}

/// Assembles evaluator managers with their per-evaluator collaborators
pub struct EvaluatorManagerFactory {
    services: DriverServices,
    sanity_checker: Option<Arc<HeartbeatSanityChecker>>,
    release_grace_period: Duration,
}

impl EvaluatorManagerFactory {
    pub fn new(services: DriverServices, config: &EvaluatorConfig) -> Self {
        Self {
            services,
            sanity_checker: config
                .heartbeat_sanity_check
                .then(|| Arc::new(HeartbeatSanityChecker::new())),
            release_grace_period: config.release_grace_period(),
        }
    }

    /// Build the manager for a freshly allocated container
    pub fn create(
        &self,
        evaluator_id: impl Into<String>,
        descriptor: EvaluatorDescriptor,
    ) -> Arc<EvaluatorManager> {
        let evaluator_id = evaluator_id.into();
        let link = EvaluatorLink::new(evaluator_id.clone());

        let dispatcher: Arc<dyn EvaluatorEventDispatcher> =
            Arc::new(EvaluatorMessageDispatcher::new(
                evaluator_id.clone(),
                Arc::clone(&self.services.handlers),
                self.services.publisher.clone(),
            ));
        let contexts = Arc::new(ContextRepresenters::new(
            Arc::clone(&link),
            Arc::clone(&dispatcher),
            Arc::clone(&self.services.codec),
        ));
        let control = Arc::new(EvaluatorControlHandler::new(
            evaluator_id.clone(),
            Arc::clone(&self.services.transport),
        ));

        let collaborators = ManagerCollaborators {
            dispatcher,
            contexts,
            control,
            launch_handler: Arc::clone(&self.services.launch_handler),
            release_handler: Arc::clone(&self.services.release_handler),
            restart: Arc::clone(&self.services.restart),
            codec: Arc::clone(&self.services.codec),
            scheduler: Arc::clone(&self.services.scheduler),
            idleness: Arc::clone(&self.services.idleness),
            sanity_checker: self.sanity_checker.clone(),
        };

        let manager = Arc::new(EvaluatorManager::new(
            Arc::clone(&link),
            Arc::new(descriptor),
            self.services.driver_remote_id.clone(),
            self.release_grace_period,
            collaborators,
        ));
        link.bind(&manager);
        debug!(evaluator_id = %evaluator_id, "Evaluator manager assembled");
        manager
    }
}
