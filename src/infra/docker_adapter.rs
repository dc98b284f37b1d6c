use crate::domain::{CommandOutput, CommandRunner, ContainerRuntime};
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const DOCKER: &str = "docker";
/// Daemon error for an unknown container id
const NO_SUCH_CONTAINER: &str = "No such container";

/// Container primitives implemented with the `docker` CLI
#[derive(Debug, Clone)]
pub struct DockerAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl DockerAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn docker(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run(DOCKER, args)
    }
}

impl ContainerRuntime for DockerAdapter {
    fn name(&self) -> &str {
        DOCKER
    }

    fn is_available(&self) -> bool {
        self.runner.is_available(DOCKER)
    }

    fn run_container(&self, image: &str, privileged: bool) -> Result<String> {
        let mut args = vec!["run", "-d", "-P"];
        if privileged {
            args.push("--privileged");
        }
        args.push(image);

        let out = self.docker(&args)?;
        if !out.success() {
            return Err(Error::Provision {
                image: image.to_string(),
                reason: format!("docker run exited with {}: {}", out.status, out.message()),
            });
        }

        let id = out.stdout.trim();
        if id.is_empty() {
            return Err(Error::Provision {
                image: image.to_string(),
                reason: "docker run printed no container id".into(),
            });
        }

        Ok(id.to_string())
    }

    fn port_mapping(&self, id: &str, container_port: u16) -> Result<String> {
        let port = container_port.to_string();
        let out = self.docker(&["port", id, &port])?;
        if !out.success() {
            return Err(Error::Provision {
                image: id.to_string(),
                reason: format!("docker port exited with {}: {}", out.status, out.message()),
            });
        }

        Ok(out.stdout)
    }

    fn remove_container(&self, id: &str) -> Result<()> {
        let out = self.docker(&["rm", "-f", id])?;

        if out.success() {
            return Ok(());
        }
        if out.stderr.contains(NO_SUCH_CONTAINER) {
            debug!("container {id} already removed");
            return Ok(());
        }

        Err(Error::Teardown {
            id: id.to_string(),
            reason: format!("docker rm exited with {}: {}", out.status, out.message()),
        })
    }

    fn build_image(&self, tag: &str, dockerfile: &Path, context: &Path) -> Result<()> {
        let dockerfile = dockerfile.to_string_lossy();
        let context = context.to_string_lossy();
        let out = self.docker(&["build", "-f", &dockerfile, "-t", tag, &context])?;

        if !out.success() {
            return Err(Error::Build {
                failed: vec![format!("{tag}: {}", out.message())],
            });
        }

        debug!("built {tag}");
        Ok(())
    }

    fn service_running(&self, id: &str, service: &str) -> Result<bool> {
        // systemd images answer to systemctl, sysvinit ones to service(8)
        let probe = format!(
            "systemctl is-active -q {service} 2>/dev/null || service {service} status >/dev/null 2>&1"
        );
        let out = self.docker(&["exec", id, "sh", "-c", &probe])?;
        Ok(out.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockCommandRunner;

    fn adapter() -> (DockerAdapter, Arc<MockCommandRunner>) {
        let runner = Arc::new(MockCommandRunner::new());
        (DockerAdapter::new(runner.clone()), runner)
    }

    #[test]
    fn test_run_container_returns_trimmed_id() {
        let (docker, runner) = adapter();
        runner.respond("docker run", 0, "f00dfeed\n");

        let id = docker.run_container("targetkit/testinfra:fedora", true).unwrap();
        assert_eq!(id, "f00dfeed");
        assert_eq!(
            runner.get_commands(),
            vec!["docker run -d -P --privileged targetkit/testinfra:fedora"]
        );
    }

    #[test]
    fn test_run_container_failure_is_provision_error() {
        let (docker, runner) = adapter();
        runner.respond("docker run", 125, "");

        let err = docker
            .run_container("targetkit/testinfra:ubuntu_trusty", false)
            .unwrap_err();
        assert!(matches!(err, Error::Provision { .. }));
        assert_eq!(
            runner.get_commands(),
            vec!["docker run -d -P targetkit/testinfra:ubuntu_trusty"]
        );
    }

    #[test]
    fn test_remove_tolerates_missing_container() {
        let (docker, runner) = adapter();
        runner.respond_stderr(
            "docker rm",
            1,
            "Error response from daemon: No such container: gone\n",
        );

        assert!(docker.remove_container("gone").is_ok());
        assert!(docker.remove_container("gone").is_ok());
        assert_eq!(runner.get_commands().len(), 2);
    }

    #[test]
    fn test_remove_reports_other_failures() {
        let (docker, runner) = adapter();
        runner.respond_stderr(
            "docker rm",
            1,
            "permission denied while trying to connect to the Docker daemon socket\n",
        );

        let err = docker.remove_container("c0ffee").unwrap_err();
        match err {
            Error::Teardown { id, reason } => {
                assert_eq!(id, "c0ffee");
                assert!(reason.contains("permission denied"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_build_image_command_line() {
        let (docker, runner) = adapter();

        docker
            .build_image(
                "targetkit/testinfra:centos_7",
                Path::new("images/centos_7/Dockerfile"),
                Path::new("images/centos_7"),
            )
            .unwrap();

        assert_eq!(
            runner.get_commands(),
            vec![
                "docker build -f images/centos_7/Dockerfile -t targetkit/testinfra:centos_7 images/centos_7"
            ]
        );
    }

    #[test]
    fn test_service_running_uses_exit_status() {
        let (docker, runner) = adapter();
        runner.respond("docker exec", 3, "");
        assert!(!docker.service_running("abc", "sshd").unwrap());

        runner.respond("docker exec", 0, "");
        assert!(docker.service_running("abc", "sshd").unwrap());
    }
}
