use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Cluster node hosting an evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub rack: Option<String>,
}

impl NodeDescriptor {
    pub fn new(node_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            node_id: node_id.into(),
            host: host.into(),
            port,
            rack: None,
        }
    }
}

/// Process that runs inside the evaluator container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorProcess {
    /// Runtime the evaluator executes in, e.g. `jvm`
    pub runtime: String,

    /// Extra command line options
    #[serde(default)]
    pub options: Vec<String>,
}

impl EvaluatorProcess {
    pub fn new(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }
}

impl Default for EvaluatorProcess {
    fn default() -> Self {
        Self::new("jvm")
    }
}

/// Resources granted for an evaluator plus the process to launch in them
///
/// The process can be set once. Later attempts are rejected so a launch always uses the
/// configuration the user chose first.
#[derive(Debug)]
pub struct EvaluatorDescriptor {
    node: NodeDescriptor,
    memory_mb: u32,
    cores: u32,
    runtime_name: String,
    process: OnceLock<EvaluatorProcess>,
}

impl EvaluatorDescriptor {
    pub fn new(
        node: NodeDescriptor,
        memory_mb: u32,
        cores: u32,
        runtime_name: impl Into<String>,
    ) -> Self {
        Self {
            node,
            memory_mb,
            cores,
            runtime_name: runtime_name.into(),
            process: OnceLock::new(),
        }
    }

    pub fn node(&self) -> &NodeDescriptor {
        &self.node
    }

    pub fn memory_mb(&self) -> u32 {
        self.memory_mb
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn runtime_name(&self) -> &str {
        &self.runtime_name
    }

    pub fn process(&self) -> Option<&EvaluatorProcess> {
        self.process.get()
    }

    /// Set the process; returns it back if one was already set
    pub fn set_process(&self, process: EvaluatorProcess) -> Result<(), EvaluatorProcess> {
        self.process.set(process)
    }

    /// The configured process, falling back to (and fixing) the default one
    pub fn process_or_default(&self) -> EvaluatorProcess {
        self.process.get_or_init(EvaluatorProcess::default).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> EvaluatorDescriptor {
        EvaluatorDescriptor::new(NodeDescriptor::new("node-1", "10.0.0.5", 9000), 2048, 2, "yarn")
    }

    #[test]
    fn test_process_set_once() {
        let descriptor = descriptor();
        assert!(descriptor.process().is_none());

        descriptor
            .set_process(EvaluatorProcess::new("jvm").with_option("-Xmx2g"))
            .unwrap();
        let rejected = descriptor.set_process(EvaluatorProcess::new("clr"));
        assert_eq!(rejected.unwrap_err().runtime, "clr");
        assert_eq!(descriptor.process().unwrap().options, vec!["-Xmx2g".to_string()]);
    }

    #[test]
    fn test_default_process_is_fixed_on_first_use() {
        let descriptor = descriptor();
        assert_eq!(descriptor.process_or_default().runtime, "jvm");
        assert!(descriptor.set_process(EvaluatorProcess::new("clr")).is_err());
        assert_eq!(descriptor.memory_mb(), 2048);
        assert_eq!(descriptor.node().host, "10.0.0.5");
    }
}
