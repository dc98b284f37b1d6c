pub mod build;
pub mod doctor;
pub mod up;

use crate::domain::HostSpec;
use crate::services::Connection;
use std::fmt::Write;

/// Human-readable summary of a parsed host spec
pub fn describe_spec(spec: &HostSpec) -> String {
    let mut out = format!("transport: {}\nimage:     {}\n", spec.transport, spec.image);
    for (key, value) in &spec.params {
        let _ = writeln!(out, "param:     {key}={value}");
    }
    out
}

/// Human-readable summary of a resolved connection
pub fn describe_connection(conn: &Connection) -> String {
    use crate::domain::ConnectionConfig::*;

    let mut out = format!(
        "{}\ncontainer: {}\nendpoint:  {}:{}\n",
        conn.spec, conn.target.id, conn.target.host, conn.target.port
    );
    let _ = match &conn.config {
        Exec { container_id } => writeln!(out, "exec:      docker exec -it {container_id} sh"),
        Ssh {
            host, ssh_config, ..
        } => writeln!(out, "ssh:       ssh -F {} {host}", ssh_config.display()),
        Ansible {
            host, inventory, ..
        } => writeln!(out, "ansible:   ansible -i {} {host} -m ping", inventory.display()),
    };
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionConfig, TargetHandle};
    use std::path::PathBuf;

    #[test]
    fn test_describe_spec() {
        let spec = HostSpec::parse("ssh://debian_jessie/user=alice").unwrap();
        let text = describe_spec(&spec);
        assert!(text.contains("transport: ssh"));
        assert!(text.contains("param:     user=alice"));
    }

    #[test]
    fn test_describe_ssh_connection() {
        let conn = Connection {
            spec: HostSpec::parse("ssh://fedora").unwrap(),
            target: TargetHandle {
                id: "abc".into(),
                host: "localhost".into(),
                port: 32770,
            },
            config: ConnectionConfig::Ssh {
                host: "fedora".into(),
                ssh_config: PathBuf::from("/tmp/x/ssh_config"),
                key: PathBuf::from("/tmp/x/ssh_key"),
            },
        };

        let text = describe_connection(&conn);
        assert!(text.contains("endpoint:  localhost:32770"));
        assert!(text.contains("ssh -F /tmp/x/ssh_config fedora"));
    }
}
