use std::path::PathBuf;
use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced while preparing, provisioning or connecting to targets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Host spec string is malformed
    #[error("invalid host spec '{spec}': {reason}")]
    Parse { spec: String, reason: String },

    /// Transport is not known or has no container-backed handler
    #[error("unsupported transport '{transport}'")]
    UnsupportedTransport { transport: String },

    /// A tool needed by the requested transport is not installed
    #[error("{tool} is required for this transport but was not found")]
    MissingDependency { tool: &'static str },

    /// No container runtime on this host; target tests should be skipped
    #[error("container runtime '{runtime}' is not available")]
    Unavailable { runtime: String },

    #[error("failed to provision target from image '{image}': {reason}")]
    Provision { image: String, reason: String },

    #[error("failed to remove container '{id}': {reason}")]
    Teardown { id: String, reason: String },

    /// Aggregate failure of the pre-suite image builds
    #[error("one or more image builds failed: {}", failed.join(", "))]
    Build { failed: Vec<String> },

    #[error("remote service did not report running after {waited:?}")]
    ProbeTimeout { waited: Duration },

    #[error("could not run '{program}'")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn parse(spec: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the test using this target should be skipped rather than failed.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::MissingDependency { .. })
    }
}
