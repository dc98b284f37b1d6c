use std::fmt;
use std::path::PathBuf;

/// Lifetime boundary controlling how long a target is reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Torn down after every test (destructive tests)
    Test,
    /// Shared by every test of the run
    Session,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// One live instance of a scope.
///
/// Every per-test scope gets its own instance; the session has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    pub kind: Scope,
    instance: u64,
}

impl ScopeId {
    pub const SESSION: ScopeId = ScopeId {
        kind: Scope::Session,
        instance: 0,
    };

    /// Per-test instance `instance`; `0` is never handed out for tests
    pub(crate) fn test(instance: u64) -> Self {
        Self {
            kind: Scope::Test,
            instance,
        }
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Scope::Session => write!(f, "session"),
            Scope::Test => write!(f, "test#{}", self.instance),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub image: String,
    pub scope: ScopeId,
}

impl TargetKey {
    pub fn new(image: impl Into<String>, scope: ScopeId) -> Self {
        Self {
            image: image.into(),
            scope,
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.image, self.scope)
    }
}

/// A running, reachable container instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHandle {
    /// Container id as reported by the runtime
    pub id: String,
    pub host: String,
    /// Host port published for the SSH daemon
    pub port: u16,
}

/// A single image build scheduled before the suite starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTask {
    pub image: String,
    pub dockerfile: PathBuf,
    pub context: PathBuf,
}
