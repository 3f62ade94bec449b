use std::io;
use thiserror::Error;

/// Failures raised while resolving or defining classes and resources.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("i/o failure on {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed class file for {name}: {reason}")]
    ClassFormat { name: String, reason: String },

    #[error("class file declares name {declared} but {requested} was requested")]
    NameMismatch { requested: String, declared: String },

    #[error(
        "class file for {name} has major version {found} but only versions up to {max} are \
         supported; upgrade class-world or recompile the artifact for an older target"
    )]
    UnsupportedVersion { name: String, found: u16, max: u16 },
}

impl LoadError {
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Fatal errors abort resolution immediately instead of falling through
    /// to the next loader in the chain.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedVersion { .. })
    }
}

/// Failures raised by one isolated task execution, one variant per lifecycle
/// step that can go wrong.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to assemble the isolation class loader chain")]
    LoaderSetup(#[source] LoadError),

    #[error("cannot load delegate class {name} through the isolation chain")]
    DelegateLoad {
        name: String,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    UnsupportedClassVersion(LoadError),

    #[error("no constructor registered for delegate class {0}")]
    UnknownDelegate(String),

    #[error("failed to construct delegate {name}")]
    Construction {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to configure delegate {name}")]
    Configuration {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("delegate execution failed")]
    Execution(#[source] anyhow::Error),

    #[error("failed to close the isolation loader chain")]
    Teardown(#[source] LoadError),
}
