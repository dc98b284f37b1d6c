use crate::domain::{BuildTask, ContainerRuntime};
use crate::error::{Error, Result};
use crate::infra::Settings;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// File marking a directory under the images root as buildable
pub const BUILD_FILE: &str = "Dockerfile";

/// Builds every suite image in parallel before any target is provisioned
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    runtime: Arc<dyn ContainerRuntime>,
    settings: Arc<Settings>,
}

impl ImageBuilder {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: Arc<Settings>) -> Self {
        Self { runtime, settings }
    }

    /// Lists direct subdirectories of `images_root` that contain a Dockerfile
    pub fn discover(&self, images_root: &Path) -> Result<Vec<BuildTask>> {
        let entries = fs::read_dir(images_root).map_err(|e| Error::io(images_root, e))?;
        let mut tasks = Vec::new();

        for entry in entries {
            let path = entry.map_err(|e| Error::io(images_root, e))?.path();
            if !path.is_dir() {
                continue;
            }

            let dockerfile = path.join(BUILD_FILE);
            if !dockerfile.is_file() {
                debug!("skipping {:?}: no {BUILD_FILE}", path.file_name());
                continue;
            }

            let Some(image) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("skipping {:?}: name is not valid UTF-8", path);
                continue;
            };

            tasks.push(BuildTask {
                image: image.to_string(),
                dockerfile,
                context: path.clone(),
            });
        }

        tasks.sort_by(|a, b| a.image.cmp(&b.image));
        Ok(tasks)
    }

    /// Builds all discovered images, one thread each, and waits for every build.
    ///
    /// Nothing is built when the runtime is missing; target tests skip instead.
    pub fn build_all(&self, images_root: &Path) -> Result<()> {
        if !self.runtime.is_available() {
            warn!("container runtime not available, skipping image builds");
            return Ok(());
        }

        let tasks = self.discover(images_root)?;
        if tasks.is_empty() {
            warn!("no images to build under {:?}", images_root);
            return Ok(());
        }

        info!("building {} image(s) from {:?}", tasks.len(), images_root);

        let failed: Vec<String> = thread::scope(|s| {
            let handles: Vec<_> = tasks
                .iter()
                .map(|task| (task, s.spawn(move || self.build_one(task))))
                .collect();

            handles
                .into_iter()
                .filter_map(|(task, handle)| match handle.join() {
                    Ok(Ok(())) => None,
                    Ok(Err(_)) => Some(task.image.clone()),
                    Err(_) => {
                        error!("build of {} panicked", task.image);
                        Some(task.image.clone())
                    }
                })
                .collect()
        });

        if failed.is_empty() {
            info!("all images built");
            return Ok(());
        }

        Err(Error::Build { failed })
    }

    fn build_one(&self, task: &BuildTask) -> Result<()> {
        let tag = self.settings.image_tag(&task.image);
        info!("BUILD {}", task.image);

        self.runtime
            .build_image(&tag, &task.dockerfile, &task.context)
            .inspect_err(|e| error!("build of {} failed: {e}", task.image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRuntime;
    use std::time::Duration;
    use tempfile::TempDir;

    fn images_root(images: &[&str]) -> TempDir {
        let root = TempDir::new().unwrap();
        for image in images {
            let dir = root.path().join(image);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join(BUILD_FILE), "FROM scratch\n").unwrap();
        }
        root
    }

    fn builder() -> (ImageBuilder, Arc<MockRuntime>) {
        let mock = Arc::new(MockRuntime::new());
        let builder = ImageBuilder::new(mock.clone(), Arc::new(Settings::default()));
        (builder, mock)
    }

    #[test]
    fn test_discover_only_dirs_with_dockerfile() {
        let root = images_root(&["fedora", "centos_7"]);
        fs::create_dir(root.path().join("notes")).unwrap();
        fs::write(root.path().join("README"), "not an image").unwrap();
        let (builder, _mock) = builder();

        let tasks = builder.discover(root.path()).unwrap();

        let names: Vec<&str> = tasks.iter().map(|t| t.image.as_str()).collect();
        assert_eq!(names, vec!["centos_7", "fedora"]);
        assert_eq!(tasks[1].dockerfile, root.path().join("fedora").join(BUILD_FILE));
        assert_eq!(tasks[1].context, root.path().join("fedora"));
    }

    #[test]
    fn test_discover_missing_root_is_io_error() {
        let (builder, _mock) = builder();
        let err = builder
            .discover(Path::new("/nonexistent/targetkit/images"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_build_all_tags_every_image() {
        let root = images_root(&["debian_jessie", "fedora", "ubuntu_trusty"]);
        let (builder, mock) = builder();

        builder.build_all(root.path()).unwrap();

        let commands = mock.get_commands();
        for image in ["debian_jessie", "fedora", "ubuntu_trusty"] {
            assert!(commands.contains(&format!("build:targetkit/testinfra:{image}")));
        }
    }

    #[test]
    fn test_one_failure_waits_for_all_builds() {
        let root = images_root(&["centos_7", "debian_jessie", "fedora"]);
        let (builder, mock) = builder();
        mock.fail_build("targetkit/testinfra:centos_7");
        mock.set_build_delay(Duration::from_millis(30));

        let err = builder.build_all(root.path()).unwrap_err();

        match err {
            Error::Build { failed } => assert_eq!(failed, vec!["centos_7".to_string()]),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(mock.finished_builds(), 3);
    }

    #[test]
    fn test_unavailable_runtime_builds_nothing() {
        let root = images_root(&["fedora"]);
        let (builder, mock) = builder();
        mock.set_available(false);

        builder.build_all(root.path()).unwrap();
        assert!(!mock.get_commands().iter().any(|c| c.starts_with("build:")));
    }
}
