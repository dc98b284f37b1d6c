use std::path::{Path, PathBuf};

/// Transport-specific material needed to reach a target.
///
/// Every path lives inside the scratch directory handed to the resolver
/// and goes away with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    Exec {
        container_id: String,
    },
    Ssh {
        /// Logical host name, matching the `Host` entry of `ssh_config`
        host: String,
        ssh_config: PathBuf,
        key: PathBuf,
    },
    Ansible {
        host: String,
        inventory: PathBuf,
        key: PathBuf,
    },
}

impl ConnectionConfig {
    /// Host name a backend should connect to
    pub fn host(&self) -> &str {
        match self {
            Self::Exec { container_id } => container_id,
            Self::Ssh { host, .. } | Self::Ansible { host, .. } => host,
        }
    }

    pub fn key(&self) -> Option<&Path> {
        match self {
            Self::Exec { .. } => None,
            Self::Ssh { key, .. } | Self::Ansible { key, .. } => Some(key),
        }
    }
}

/// Inventory variable naming, which changed between ansible 1.x and 2.x
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventorySchema {
    V1,
    V2,
}

impl InventorySchema {
    pub fn from_major(major: u32) -> Self {
        if major <= 1 { Self::V1 } else { Self::V2 }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Self::V1 => "ansible_ssh_",
            Self::V2 => "ansible_",
        }
    }
}

/// Endpoint details written into generated client configuration
#[derive(Debug, Clone, Copy)]
pub struct SshEndpoint<'a> {
    pub name: &'a str,
    pub host: &'a str,
    pub user: &'a str,
    pub port: u16,
    pub key: &'a Path,
}

impl SshEndpoint<'_> {
    pub fn inventory_line(&self, schema: InventorySchema) -> String {
        let prefix = schema.prefix();
        format!(
            "{} ansible_ssh_private_key_file={} {prefix}host={} {prefix}user={} {prefix}port={}\n",
            self.name,
            self.key.display(),
            self.host,
            self.user,
            self.port,
        )
    }

    /// Client block for throwaway hosts: host keys are never checked or stored
    pub fn ssh_config(&self) -> String {
        format!(
            "Host {}\n  Hostname {}\n  User {}\n  Port {}\n  UserKnownHostsFile /dev/null\n  StrictHostKeyChecking no\n  IdentityFile {}\n  IdentitiesOnly yes\n  LogLevel FATAL\n",
            self.name,
            self.host,
            self.user,
            self.port,
            self.key.display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(key: &Path) -> SshEndpoint<'_> {
        SshEndpoint {
            name: "debian_jessie",
            host: "localhost",
            user: "root",
            port: 32768,
            key,
        }
    }

    #[test]
    fn test_schema_selection() {
        assert_eq!(InventorySchema::from_major(1), InventorySchema::V1);
        assert_eq!(InventorySchema::from_major(2), InventorySchema::V2);
        assert_eq!(InventorySchema::from_major(9), InventorySchema::V2);
    }

    #[test]
    fn test_inventory_v1() {
        let key = PathBuf::from("/tmp/scratch/ssh_key");
        let line = endpoint(&key).inventory_line(InventorySchema::V1);
        assert_eq!(
            line,
            "debian_jessie ansible_ssh_private_key_file=/tmp/scratch/ssh_key ansible_ssh_host=localhost ansible_ssh_user=root ansible_ssh_port=32768\n"
        );
    }

    #[test]
    fn test_inventory_v2() {
        let key = PathBuf::from("/tmp/scratch/ssh_key");
        let line = endpoint(&key).inventory_line(InventorySchema::V2);
        assert!(line.contains("ansible_host=localhost"));
        assert!(line.contains("ansible_user=root"));
        assert!(line.contains("ansible_port=32768"));
        assert!(!line.contains("ansible_ssh_host="));
        assert!(line.contains("ansible_ssh_private_key_file=/tmp/scratch/ssh_key"));
    }

    #[test]
    fn test_ssh_config_block() {
        let key = PathBuf::from("/tmp/scratch/ssh_key");
        let config = endpoint(&key).ssh_config();
        let lines: Vec<&str> = config.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Host debian_jessie",
                "  Hostname localhost",
                "  User root",
                "  Port 32768",
                "  UserKnownHostsFile /dev/null",
                "  StrictHostKeyChecking no",
                "  IdentityFile /tmp/scratch/ssh_key",
                "  IdentitiesOnly yes",
                "  LogLevel FATAL",
            ]
        );
    }

    #[test]
    fn test_connection_host() {
        let exec = ConnectionConfig::Exec {
            container_id: "abc123".into(),
        };
        assert_eq!(exec.host(), "abc123");
        assert!(exec.key().is_none());
    }
}
