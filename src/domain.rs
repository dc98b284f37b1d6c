mod connection;
mod host_spec;
mod target;
pub mod traits;

pub use connection::{ConnectionConfig, InventorySchema, SshEndpoint};
pub use host_spec::{HostSpec, Transport};
pub use target::{BuildTask, Scope, ScopeId, TargetHandle, TargetKey};
pub use traits::{BackendFactory, CommandOutput, CommandRunner, ContainerRuntime};
