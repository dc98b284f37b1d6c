use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_NAME: &str = "targetkit.toml";

/// Images that need `--privileged` to boot their init system
const DEFAULT_PRIVILEGED_IMAGES: [&str; 3] = ["debian_jessie", "centos_7", "fedora"];
/// Images whose SSH daemon unit is called `sshd` rather than `ssh`
const DEFAULT_SSHD_IMAGES: [&str; 2] = ["centos_7", "fedora"];

/// On-disk configuration; every field is optional so files can be layered.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub namespace: Option<String>,
    pub suite: Option<String>,
    pub images_root: Option<PathBuf>,
    pub ssh_key: Option<PathBuf>,
    pub default_user: Option<String>,
    pub ssh_port: Option<u16>,
    pub poll_interval_ms: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub privileged_images: Option<Vec<String>>,
    pub sshd_images: Option<Vec<String>>,
}

impl AppConfig {
    /// Layers `other` on top: each field set in `other` wins, unset ones keep ours.
    pub fn merge(&mut self, other: AppConfig) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }

        take!(
            namespace,
            suite,
            images_root,
            ssh_key,
            default_user,
            ssh_port,
            poll_interval_ms,
            probe_timeout_secs,
            privileged_images,
            sshd_images
        );
    }

    /// Fills unset fields with defaults
    pub fn into_settings(self) -> Settings {
        Settings {
            namespace: self.namespace.unwrap_or_else(|| "targetkit".into()),
            suite: self.suite.unwrap_or_else(|| "testinfra".into()),
            images_root: expand(self.images_root.unwrap_or_else(|| PathBuf::from("images"))),
            ssh_key: expand(self.ssh_key.unwrap_or_else(|| PathBuf::from("ssh_key"))),
            default_user: self.default_user.unwrap_or_else(|| "root".into()),
            ssh_port: self.ssh_port.unwrap_or(22),
            poll_interval: Duration::from_millis(self.poll_interval_ms.unwrap_or(500)),
            probe_timeout: self.probe_timeout_secs.map(Duration::from_secs),
            privileged_images: self
                .privileged_images
                .unwrap_or_else(|| owned(&DEFAULT_PRIVILEGED_IMAGES)),
            sshd_images: self
                .sshd_images
                .unwrap_or_else(|| owned(&DEFAULT_SSHD_IMAGES)),
        }
    }
}

/// Resolved configuration shared by the services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub namespace: String,
    pub suite: String,
    pub images_root: PathBuf,
    /// Private key copied next to every generated SSH configuration
    pub ssh_key: PathBuf,
    pub default_user: String,
    /// Port the SSH daemon listens on inside the container
    pub ssh_port: u16,
    pub poll_interval: Duration,
    pub probe_timeout: Option<Duration>,
    pub privileged_images: Vec<String>,
    pub sshd_images: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        AppConfig::default().into_settings()
    }
}

impl Settings {
    /// `<namespace>/<suite>:<image>`
    pub fn image_tag(&self, image: &str) -> String {
        format!("{}/{}:{}", self.namespace, self.suite, image)
    }

    pub fn is_privileged(&self, image: &str) -> bool {
        self.privileged_images.iter().any(|i| i == image)
    }

    pub fn ssh_service(&self, image: &str) -> &'static str {
        if self.sshd_images.iter().any(|i| i == image) {
            "sshd"
        } else {
            "ssh"
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn expand(path: PathBuf) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.to_string_lossy().as_ref()).into_owned())
}

pub fn read_config_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    toml::from_str(&content).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Loads the optional global file, then `./targetkit.toml` on top of it.
pub fn load_settings(global: Option<&Path>) -> Result<Settings> {
    let mut app_config = AppConfig::default();

    if let Some(path) = global {
        debug!("loading config from {:?}", path);
        app_config = read_config_file(path)?;
    }

    let local_config_path = PathBuf::from("./").join(DEFAULT_CONFIG_NAME);
    if local_config_path.exists() {
        debug!("merging local config {:?}", local_config_path);
        app_config.merge(read_config_file(&local_config_path)?);
    }

    Ok(app_config.into_settings())
}
