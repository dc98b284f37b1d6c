use crate::domain::{CommandRunner, InventorySchema};
use crate::infra::{Settings, SystemCommandRunner, ansible};
use anyhow::Result;
use tracing::{info, warn};

/// Reports which transports this host can serve
pub fn doctor(settings: &Settings) -> Result<()> {
    let runner = SystemCommandRunner::new();

    if runner.is_available("docker") {
        info!("docker available");
    } else {
        warn!("docker not found in PATH: target tests will be skipped");
    }

    match ansible::detect_inventory_schema(&runner) {
        Some(InventorySchema::V1) => info!("ansible 1.x available (ansible_ssh_* inventory)"),
        Some(InventorySchema::V2) => info!("ansible 2+ available (ansible_* inventory)"),
        None => warn!("ansible not found: ansible:// hosts will be skipped"),
    }

    if settings.ssh_key.is_file() {
        info!("ssh key: {:?}", settings.ssh_key);
    } else {
        warn!(
            "ssh key missing at {:?}: ssh transports will fail",
            settings.ssh_key
        );
    }

    if settings.images_root.is_dir() {
        info!("images root: {:?}", settings.images_root);
    } else {
        warn!("images root {:?} does not exist", settings.images_root);
    }

    Ok(())
}
