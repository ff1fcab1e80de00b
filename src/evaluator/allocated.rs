use super::descriptor::{EvaluatorDescriptor, EvaluatorProcess};
use super::link::EvaluatorLink;
use crate::error::EvaluatorResult;
use crate::protocol::ResourceLaunchEvent;
use std::fmt;
use std::sync::Arc;

/// An evaluator whose container has been granted but not launched yet
///
/// Submitting a context (optionally with a task) launches the evaluator. An evaluator can
/// be launched once; a second submission is a protocol violation.
#[derive(Clone)]
pub struct AllocatedEvaluator {
    link: Arc<EvaluatorLink>,
    descriptor: Arc<EvaluatorDescriptor>,
}

impl AllocatedEvaluator {
    pub fn new(link: Arc<EvaluatorLink>, descriptor: Arc<EvaluatorDescriptor>) -> Self {
        Self { link, descriptor }
    }

    pub fn id(&self) -> &str {
        self.link.evaluator_id()
    }

    pub fn descriptor(&self) -> &EvaluatorDescriptor {
        &self.descriptor
    }

    pub fn set_process(&self, process: EvaluatorProcess) -> EvaluatorResult<()> {
        self.link.manager()?.set_process(process)
    }

    /// Launch the evaluator with a root context
    pub fn submit_context(&self, context_configuration: impl Into<String>) -> EvaluatorResult<()> {
        self.launch(context_configuration.into(), None)
    }

    /// Launch the evaluator with a root context and start a task in it
    pub fn submit_context_and_task(
        &self,
        context_configuration: impl Into<String>,
        task_configuration: impl Into<String>,
    ) -> EvaluatorResult<()> {
        self.launch(
            context_configuration.into(),
            Some(task_configuration.into()),
        )
    }

    /// Give the container back without launching anything
    pub fn close(&self) -> EvaluatorResult<()> {
        self.link.manager()?.close();
        Ok(())
    }

    fn launch(
        &self,
        context_configuration: String,
        task_configuration: Option<String>,
    ) -> EvaluatorResult<()> {
        let manager = self.link.manager()?;
        let event = ResourceLaunchEvent {
            evaluator_id: self.id().to_string(),
            driver_remote_id: manager.driver_remote_id().to_string(),
            process: self.descriptor.process_or_default(),
            context_configuration,
            task_configuration,
        };
        manager.on_resource_launch(event)
    }
}

impl fmt::Debug for AllocatedEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocatedEvaluator")
            .field("evaluator_id", &self.id())
            .field("node", &self.descriptor.node().node_id)
            .field("memory_mb", &self.descriptor.memory_mb())
            .finish()
    }
}
