use super::registry::Provisioned;
use crate::domain::{ContainerRuntime, TargetHandle};
use crate::error::{Error, Result};
use crate::infra::Settings;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_TARGET_HOST: &str = "localhost";

/// Starts containers from suite images and works out how to reach them
#[derive(Debug, Clone)]
pub struct TargetProvisioner {
    runtime: Arc<dyn ContainerRuntime>,
    settings: Arc<Settings>,
}

impl TargetProvisioner {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: Arc<Settings>) -> Self {
        Self { runtime, settings }
    }

    pub fn provision(&self, image: &str) -> Result<Provisioned> {
        let tag = self.settings.image_tag(image);
        let privileged = self.settings.is_privileged(image);
        info!("starting {tag}{}", if privileged { " (privileged)" } else { "" });

        let id = self
            .runtime
            .run_container(&tag, privileged)
            .map_err(|e| provision_error(image, e))?;

        let port = match self.published_port(&id) {
            Ok(port) => port,
            Err(e) => {
                // never hand back or leak a half-provisioned target
                remove(self.runtime.as_ref(), &id);
                return Err(provision_error(image, e));
            }
        };

        let host = docker_host(std::env::var("DOCKER_HOST").ok().as_deref());
        debug!("{image} is {id}, ssh published on {host}:{port}");

        let runtime = self.runtime.clone();
        let teardown_id = id.clone();
        Ok(Provisioned::new(TargetHandle { id, host, port }, move || {
            remove(runtime.as_ref(), &teardown_id)
        }))
    }

    fn published_port(&self, id: &str) -> Result<u16> {
        let ssh_port = self.settings.ssh_port;
        let raw = self.runtime.port_mapping(id, ssh_port)?;
        parse_published_port(&raw).ok_or_else(|| Error::Provision {
            image: id.to_string(),
            reason: format!("no published port for {ssh_port} in {:?}", raw.trim()),
        })
    }
}

fn remove(runtime: &dyn ContainerRuntime, id: &str) {
    if let Err(e) = runtime.remove_container(id) {
        warn!("failed to remove container {id}: {e}");
    }
}

fn provision_error(image: &str, err: Error) -> Error {
    match err {
        Error::Provision { reason, .. } => Error::Provision {
            image: image.to_string(),
            reason,
        },
        other => Error::Provision {
            image: image.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Port after the last `:` of the first mapping line (`0.0.0.0:32768`)
pub fn parse_published_port(mapping: &str) -> Option<u16> {
    let line = mapping.lines().map(str::trim).find(|l| !l.is_empty())?;
    line.rsplit(':').next()?.parse().ok()
}

/// Host part of a `DOCKER_HOST` URL, `localhost` when unset or hostless
pub fn docker_host(docker_host: Option<&str>) -> String {
    docker_host
        .and_then(url_hostname)
        .unwrap_or_else(|| DEFAULT_TARGET_HOST.to_string())
}

fn url_hostname(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    let host = match authority.strip_prefix('[') {
        Some(v6) => v6.split(']').next()?,
        None => authority.split(':').next()?,
    };

    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}
