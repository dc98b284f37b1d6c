use super::image_builder::ImageBuilder;
use super::provisioner::TargetProvisioner;
use super::registry::{ScopeGuard, TargetRegistry};
use super::resolver::ConnectionResolver;
use crate::domain::{
    BackendFactory, ConnectionConfig, ContainerRuntime, HostSpec, InventorySchema, Scope,
    ScopeId, TargetHandle, TargetKey,
};
use crate::error::{Error, Result};
use crate::infra::{DockerAdapter, Settings, SystemCommandRunner, ansible};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// Host used by tests that do not ask for specific hosts
pub const DEFAULT_HOST_SPEC: &str = "docker://debian_jessie";

/// A target ready to be handed to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub spec: HostSpec,
    pub target: TargetHandle,
    pub config: ConnectionConfig,
}

impl Connection {
    /// Name the target reports for itself: the image it was started from
    pub fn hostname(&self) -> &str {
        &self.spec.image
    }
}

/// Entry point for a test harness: builds images, hands out connected
/// targets per scope and tears them down when scopes end.
#[derive(Debug)]
pub struct Fixtures {
    runtime: Arc<dyn ContainerRuntime>,
    settings: Arc<Settings>,
    registry: TargetRegistry,
    provisioner: TargetProvisioner,
    resolver: ConnectionResolver,
    builder: ImageBuilder,
    available: OnceLock<bool>,
}

impl Fixtures {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        settings: Settings,
        inventory_schema: Option<InventorySchema>,
    ) -> Self {
        let settings = Arc::new(settings);
        Self {
            registry: TargetRegistry::new(),
            provisioner: TargetProvisioner::new(runtime.clone(), settings.clone()),
            resolver: ConnectionResolver::new(runtime.clone(), settings.clone(), inventory_schema),
            builder: ImageBuilder::new(runtime.clone(), settings.clone()),
            runtime,
            settings,
            available: OnceLock::new(),
        }
    }

    /// Wires the docker CLI and whatever ansible is installed
    pub fn with_docker(settings: Settings) -> Self {
        let runner = Arc::new(SystemCommandRunner::new());
        let schema = ansible::detect_inventory_schema(runner.as_ref());
        Self::new(Arc::new(DockerAdapter::new(runner)), settings, schema)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Whether the container runtime is usable; checked once per process
    pub fn available(&self) -> bool {
        *self.available.get_or_init(|| self.runtime.is_available())
    }

    /// Builds every image under the configured images root
    pub fn prepare(&self) -> Result<()> {
        self.builder.build_all(&self.settings.images_root)
    }

    /// Gets or provisions the target for `host_spec` in `scope` and resolves
    /// its connection, writing generated files into `scratch_dir`.
    pub fn connect(
        &self,
        host_spec: &str,
        scope: ScopeId,
        scratch_dir: &Path,
    ) -> Result<Connection> {
        if !self.available() {
            return Err(Error::Unavailable {
                runtime: self.runtime.name().to_string(),
            });
        }

        let spec = HostSpec::parse(host_spec)?;
        self.resolver.check_supported(&spec)?;

        let key = TargetKey::new(spec.image.clone(), scope);
        let target = self
            .registry
            .get_or_create(&key, || self.provisioner.provision(&spec.image))?;

        let config = self.resolver.resolve(&spec, &target, scratch_dir)?;
        info!("{spec} ready as {}", config.host());

        Ok(Connection {
            spec,
            target,
            config,
        })
    }

    pub fn backend<F: BackendFactory>(
        &self,
        factory: &F,
        connection: &Connection,
    ) -> Result<F::Backend> {
        factory.backend(&connection.spec, &connection.config)
    }

    /// Opens a scope instance; pass `guard.id()` to [`Fixtures::connect`]
    pub fn scope(&self, scope: Scope) -> ScopeGuard<'_> {
        self.registry.scope(scope)
    }

    pub fn end_scope(&self, scope: ScopeId) -> usize {
        self.registry.end_scope(scope)
    }
}
