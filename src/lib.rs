pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

// Public so tests/ can drive the mocks
pub mod test_support;

pub use domain::{
    BackendFactory, CommandOutput, CommandRunner, ConnectionConfig, ContainerRuntime, HostSpec,
    InventorySchema, Scope, ScopeId, TargetHandle, TargetKey, Transport,
};
pub use error::{Error, Result};
pub use infra::{DockerAdapter, Settings, SystemCommandRunner};
pub use services::{
    Connection, ConnectionResolver, Fixtures, ImageBuilder, ReadinessPoller, TargetProvisioner,
    TargetRegistry,
};
