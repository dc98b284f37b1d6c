mod fixtures;
mod image_builder;
mod poller;
mod provisioner;
mod registry;
mod resolver;

pub use fixtures::{Connection, DEFAULT_HOST_SPEC, Fixtures};
pub use image_builder::{BUILD_FILE, ImageBuilder};
pub use poller::{DEFAULT_POLL_INTERVAL, ReadinessPoller};
pub use provisioner::{TargetProvisioner, docker_host, parse_published_port};
pub use registry::{Provisioned, ScopeGuard, TargetRegistry};
pub use resolver::ConnectionResolver;
