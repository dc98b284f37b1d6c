use crate::domain::{CommandOutput, CommandRunner, ContainerRuntime};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MockContainer {
    pub image: String,
    pub privileged: bool,
    pub port: u16,
    pub running: bool,
}

/// In-memory container runtime recording every call
#[derive(Debug)]
pub struct MockRuntime {
    containers: RwLock<HashMap<String, MockContainer>>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<Option<String>>,
    failing_builds: RwLock<HashSet<String>>,
    build_delay: RwLock<Duration>,
    available: AtomicBool,
    next_id: AtomicUsize,
    finished_builds: AtomicUsize,
    service_probes: AtomicUsize,
    ready_after: AtomicUsize,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(None),
            failing_builds: RwLock::new(HashSet::new()),
            build_delay: RwLock::new(Duration::ZERO),
            available: AtomicBool::new(true),
            next_id: AtomicUsize::new(0),
            finished_builds: AtomicUsize::new(0),
            service_probes: AtomicUsize::new(0),
            ready_after: AtomicUsize::new(0),
        }
    }

    /// Makes every call of `operation` (run, port, remove, build, service) fail
    pub fn set_fail_on(&self, operation: &str) {
        *self.fail_on.write().unwrap() = Some(operation.to_string());
    }

    pub fn fail_build(&self, tag: &str) {
        self.failing_builds.write().unwrap().insert(tag.to_string());
    }

    pub fn set_build_delay(&self, delay: Duration) {
        *self.build_delay.write().unwrap() = delay;
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// The first `probes` service checks report "not running"
    pub fn set_service_ready_after(&self, probes: usize) {
        self.ready_after.store(probes, Ordering::SeqCst);
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn running_containers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .containers
            .read()
            .unwrap()
            .iter()
            .filter(|(_, c)| c.running)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn container(&self, id: &str) -> Option<MockContainer> {
        self.containers.read().unwrap().get(id).cloned()
    }

    pub fn finished_builds(&self) -> usize {
        self.finished_builds.load(Ordering::SeqCst)
    }

    pub fn service_probes(&self) -> usize {
        self.service_probes.load(Ordering::SeqCst)
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str) -> Result<()> {
        if self.fail_on.read().unwrap().as_deref() == Some(operation) {
            return Err(Error::Provision {
                image: operation.to_string(),
                reason: format!("mock failure on: {operation}"),
            });
        }
        Ok(())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn run_container(&self, image: &str, privileged: bool) -> Result<String> {
        if privileged {
            self.record_command(&format!("run:{image}:privileged"));
        } else {
            self.record_command(&format!("run:{image}"));
        }
        self.check_fail("run")?;

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("mock-{n}");
        self.containers.write().unwrap().insert(
            id.clone(),
            MockContainer {
                image: image.to_string(),
                privileged,
                port: 32768 + n as u16,
                running: true,
            },
        );
        Ok(id)
    }

    fn port_mapping(&self, id: &str, _container_port: u16) -> Result<String> {
        self.record_command(&format!("port:{id}"));
        self.check_fail("port")?;

        let port = self
            .containers
            .read()
            .unwrap()
            .get(id)
            .map(|c| c.port)
            .ok_or_else(|| Error::Provision {
                image: id.to_string(),
                reason: "no such container".into(),
            })?;
        Ok(format!("0.0.0.0:{port}\n[::]:{port}\n"))
    }

    fn remove_container(&self, id: &str) -> Result<()> {
        self.record_command(&format!("remove:{id}"));
        self.check_fail("remove")?;

        if let Some(container) = self.containers.write().unwrap().get_mut(id) {
            container.running = false;
        }
        Ok(())
    }

    fn build_image(&self, tag: &str, _dockerfile: &Path, _context: &Path) -> Result<()> {
        self.record_command(&format!("build:{tag}"));
        std::thread::sleep(*self.build_delay.read().unwrap());
        self.finished_builds.fetch_add(1, Ordering::SeqCst);
        self.check_fail("build")?;

        if self.failing_builds.read().unwrap().contains(tag) {
            return Err(Error::Build {
                failed: vec![tag.to_string()],
            });
        }
        Ok(())
    }

    fn service_running(&self, id: &str, service: &str) -> Result<bool> {
        self.record_command(&format!("service:{id}:{service}"));
        let probe = self.service_probes.fetch_add(1, Ordering::SeqCst);
        self.check_fail("service")?;

        Ok(probe >= self.ready_after.load(Ordering::SeqCst))
    }
}

/// Command runner answering from canned responses
#[derive(Debug, Default)]
pub struct MockCommandRunner {
    responses: RwLock<Vec<(String, CommandOutput)>>,
    commands: RwLock<Vec<String>>,
    missing: RwLock<HashSet<String>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers commands starting with `prefix`; later responses win.
    /// Unmatched commands succeed with empty output.
    pub fn respond(&self, prefix: &str, status: i32, stdout: &str) {
        self.responses.write().unwrap().push((
            prefix.to_string(),
            CommandOutput {
                status,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
    }

    /// Like [`respond`](Self::respond), with `stderr` as the only output
    pub fn respond_stderr(&self, prefix: &str, status: i32, stderr: &str) {
        self.responses.write().unwrap().push((
            prefix.to_string(),
            CommandOutput {
                status,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
    }

    pub fn set_missing(&self, program: &str) {
        self.missing.write().unwrap().insert(program.to_string());
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.commands.write().unwrap().push(line.clone());

        if self.missing.read().unwrap().contains(program) {
            return Err(Error::Command {
                program: program.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        Ok(self
            .responses
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default())
    }

    fn is_available(&self, program: &str) -> bool {
        !self.missing.read().unwrap().contains(program)
    }
}
