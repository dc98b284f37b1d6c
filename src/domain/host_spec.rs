use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Mechanism used to run commands on a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// `docker exec` straight into the container
    Docker,
    Ssh,
    /// SSH with stricter command quoting on the backend side
    SafeSsh,
    /// SSH through a library client
    Paramiko,
    /// SSH driven by an ansible inventory
    Ansible,
    /// The host running the suite; not backed by a container
    Local,
}

impl Transport {
    pub const ALL: [Transport; 6] = [
        Transport::Docker,
        Transport::Ssh,
        Transport::SafeSsh,
        Transport::Paramiko,
        Transport::Ansible,
        Transport::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Ssh => "ssh",
            Self::SafeSsh => "safe-ssh",
            Self::Paramiko => "paramiko",
            Self::Ansible => "ansible",
            Self::Local => "local",
        }
    }

    /// Transports that reach the target through its SSH daemon
    pub fn is_ssh_family(&self) -> bool {
        matches!(
            self,
            Self::Ssh | Self::SafeSsh | Self::Paramiko | Self::Ansible
        )
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnsupportedTransport {
                transport: s.to_string(),
            })
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed form of `transport://image[/key=value[,key=value...]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub image: String,
    pub transport: Transport,
    pub params: BTreeMap<String, String>,
}

impl HostSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let (scheme, rest) = spec
            .split_once("://")
            .ok_or_else(|| Error::parse(spec, "missing '://' separator"))?;

        if scheme.is_empty() {
            return Err(Error::parse(spec, "empty transport"));
        }
        let transport: Transport = scheme.parse()?;

        let (image, raw_params) = match rest.split_once('/') {
            Some((image, params)) => (image, Some(params)),
            None => (rest, None),
        };

        if image.is_empty() {
            return Err(Error::parse(spec, "empty image name"));
        }

        let mut params = BTreeMap::new();
        if let Some(raw) = raw_params.filter(|raw| !raw.is_empty()) {
            for pair in raw.split(',') {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| Error::parse(spec, format!("parameter '{pair}' has no '='")))?;
                let key = key.trim();
                if key.is_empty() {
                    return Err(Error::parse(spec, format!("parameter '{pair}' has no key")));
                }
                params.insert(key.to_string(), value.trim().to_string());
            }
        }

        Ok(Self {
            image: image.to_string(),
            transport,
            params,
        })
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn user(&self) -> Option<&str> {
        self.param("user")
    }
}

impl FromStr for HostSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport, self.image)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '/' } else { ',' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}
