//! Error types for container assembly and service resolution.

use thiserror::Error;

/// Boxed error raised by user code (extensions, factories, custom passes).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building, compiling or querying a container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No definition or alias exists for the requested id.
    #[error("service \"{id}\" does not exist")]
    ServiceNotFound { id: String },

    /// The requested parameter is not set.
    #[error("parameter \"{name}\" does not exist")]
    ParameterNotFound { name: String },

    /// Services or parameters depend on each other in a loop.
    #[error("circular reference detected: {path}")]
    CircularReference { path: String },

    /// Aliases point at each other in a loop.
    #[error("circular alias detected: {path}")]
    CircularAlias { path: String },

    /// A definition is structurally unusable.
    #[error("invalid definition for \"{id}\": {reason}")]
    InvalidDefinition { id: String, reason: String },

    /// A definition references a service that does not exist.
    #[error("service \"{id}\" references unknown service \"{reference}\"")]
    InvalidReference { id: String, reference: String },

    /// A factory asked for an argument or reference the definition lacks.
    #[error("service \"{id}\" has no {kind} at index {index}")]
    MissingArgument {
        id: String,
        kind: &'static str,
        index: usize,
    },

    /// A service resolved to a different type than the caller expected.
    #[error("service \"{id}\" is not a {expected}")]
    ServiceTypeMismatch { id: String, expected: &'static str },

    /// A service factory failed.
    #[error("failed to create service \"{id}\": {source}")]
    Factory {
        id: String,
        #[source]
        source: BoxError,
    },

    /// A compiler pass rejected the container.
    #[error("compiler pass {pass} failed: {message}")]
    Pass { pass: String, message: String },

    /// An extension failed while populating the container.
    #[error("extension failed: {0}")]
    Extension(#[source] BoxError),
}

impl ContainerError {
    /// Wraps an error raised by an [`Extension`](crate::Extension).
    pub fn extension(error: impl Into<BoxError>) -> Self {
        Self::Extension(error.into())
    }

    /// Builds a failure for the named compiler pass.
    pub fn pass(pass: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pass {
            pass: pass.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results with [`ContainerError`].
pub type Result<T> = std::result::Result<T, ContainerError>;
