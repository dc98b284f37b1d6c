use super::{ConnectionConfig, HostSpec};
use crate::error::Result;
use std::fmt::Debug;
use std::path::Path;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was killed by a signal
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Trimmed stdout, or stderr when stdout is empty
    pub fn message(&self) -> &str {
        let out = self.stdout.trim();
        if out.is_empty() { self.stderr.trim() } else { out }
    }
}

/// Runs a program and captures its exit code and output
pub trait CommandRunner: Send + Sync + Debug {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Whether `program` can be found and started
    fn is_available(&self, program: &str) -> bool;
}

/// Container primitives the fixtures orchestrate
pub trait ContainerRuntime: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Whether the runtime binary is usable on this host
    fn is_available(&self) -> bool;

    /// Start a detached container with every exposed port published; returns its id
    fn run_container(&self, image: &str, privileged: bool) -> Result<String>;

    /// Raw `host:port` mapping published for `container_port`
    fn port_mapping(&self, id: &str, container_port: u16) -> Result<String>;

    /// Force-remove a container; removing a missing container is not an error
    fn remove_container(&self, id: &str) -> Result<()>;

    fn build_image(&self, tag: &str, dockerfile: &Path, context: &Path) -> Result<()>;

    /// Whether `service` is running inside the container
    fn service_running(&self, id: &str, service: &str) -> Result<bool>;
}

/// Produces an object able to execute commands on a resolved target
pub trait BackendFactory {
    type Backend;

    fn backend(&self, spec: &HostSpec, config: &ConnectionConfig) -> Result<Self::Backend>;
}
