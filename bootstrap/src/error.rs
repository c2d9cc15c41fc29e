//! Error types for the bootstrapper.

use std::path::PathBuf;

use pli_console::ConsoleError;
use pli_container::ContainerError;
use pli_core::SchemaError;
use thiserror::Error;

/// Errors that can occur while bootstrapping an application.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A configuration file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A YAML configuration file is malformed.
    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A JSON configuration file is malformed.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration does not match its schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Container assembly, compilation or service lookup failed.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A command could not be registered.
    #[error(transparent)]
    Console(#[from] ConsoleError),
}

/// Convenience alias for results with [`BootstrapError`].
pub type Result<T> = std::result::Result<T, BootstrapError>;
