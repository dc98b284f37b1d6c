use super::poller::ReadinessPoller;
use crate::domain::{
    ConnectionConfig, ContainerRuntime, HostSpec, InventorySchema, SshEndpoint, TargetHandle,
    Transport,
};
use crate::error::{Error, Result};
use crate::infra::Settings;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const KEY_FILE: &str = "ssh_key";
const SSH_CONFIG_FILE: &str = "ssh_config";
const INVENTORY_FILE: &str = "inventory";

/// Turns a host spec plus a provisioned target into transport-specific configuration
#[derive(Debug, Clone)]
pub struct ConnectionResolver {
    runtime: Arc<dyn ContainerRuntime>,
    settings: Arc<Settings>,
    poller: ReadinessPoller,
    inventory_schema: Option<InventorySchema>,
}

impl ConnectionResolver {
    /// `inventory_schema` is `None` when ansible is not installed
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        settings: Arc<Settings>,
        inventory_schema: Option<InventorySchema>,
    ) -> Self {
        let poller =
            ReadinessPoller::new(settings.poll_interval).with_timeout(settings.probe_timeout);
        Self {
            runtime,
            settings,
            poller,
            inventory_schema,
        }
    }

    pub fn with_poller(mut self, poller: ReadinessPoller) -> Self {
        self.poller = poller;
        self
    }

    /// Fails early for specs this resolver can never satisfy
    pub fn check_supported(&self, spec: &HostSpec) -> Result<()> {
        match spec.transport {
            Transport::Local => Err(Error::UnsupportedTransport {
                transport: spec.transport.to_string(),
            }),
            Transport::Ansible if self.inventory_schema.is_none() => {
                Err(Error::MissingDependency { tool: "ansible" })
            }
            _ => Ok(()),
        }
    }

    /// Writes whatever `spec.transport` needs into `scratch_dir` and, for SSH
    /// transports, returns only once the target's SSH daemon is running.
    pub fn resolve(
        &self,
        spec: &HostSpec,
        target: &TargetHandle,
        scratch_dir: &Path,
    ) -> Result<ConnectionConfig> {
        self.check_supported(spec)?;

        if spec.transport == Transport::Docker {
            return Ok(ConnectionConfig::Exec {
                container_id: target.id.clone(),
            });
        }

        let key = self.write_key(scratch_dir)?;
        let endpoint = SshEndpoint {
            name: &spec.image,
            host: &target.host,
            user: spec.user().unwrap_or(&self.settings.default_user),
            port: target.port,
            key: &key,
        };

        let config = match (spec.transport, self.inventory_schema) {
            (Transport::Ansible, Some(schema)) => {
                let inventory = scratch_dir.join(INVENTORY_FILE);
                write_file(&inventory, &endpoint.inventory_line(schema))?;
                ConnectionConfig::Ansible {
                    host: spec.image.clone(),
                    inventory,
                    key: key.clone(),
                }
            }
            _ => {
                let ssh_config = scratch_dir.join(SSH_CONFIG_FILE);
                write_file(&ssh_config, &endpoint.ssh_config())?;
                ConnectionConfig::Ssh {
                    host: spec.image.clone(),
                    ssh_config,
                    key: key.clone(),
                }
            }
        };

        self.wait_for_ssh(&spec.image, target)?;
        Ok(config)
    }

    fn wait_for_ssh(&self, image: &str, target: &TargetHandle) -> Result<()> {
        let service = self.settings.ssh_service(image);
        info!("waiting for {service} on {image} ({})", target.id);

        self.poller.wait_until_running(|| {
            match self.runtime.service_running(&target.id, service) {
                Ok(running) => running,
                Err(e) => {
                    debug!("probing {service} on {} failed: {e}", target.id);
                    false
                }
            }
        })
    }

    fn write_key(&self, scratch_dir: &Path) -> Result<PathBuf> {
        let material =
            fs::read(&self.settings.ssh_key).map_err(|e| Error::io(&self.settings.ssh_key, e))?;
        let path = scratch_dir.join(KEY_FILE);
        write_private(&path, &material)?;
        Ok(path)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| Error::io(path, e))
}

/// Writes `content` readable and writable by the owner only
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| Error::io(path, e))?;
    file.write_all(content).map_err(|e| Error::io(path, e))?;

    // mode() is filtered by the umask and ignored for existing files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::io(path, e))?;
    }

    Ok(())
}
