//! Error types for the application shell.

use pli_container::BoxError;
use thiserror::Error;

/// Errors raised while registering or running commands.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Two enabled commands share a name.
    #[error("a command named \"{name}\" is already registered")]
    DuplicateCommand { name: String },

    /// No registered command matches the requested name.
    #[error("command \"{name}\" is not defined")]
    UnknownCommand { name: String },

    /// The command line could not be parsed.
    #[error(transparent)]
    Arguments(#[from] clap::Error),

    /// A command failed while executing.
    #[error("command \"{name}\" failed: {source}")]
    Command {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Writing command output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// Wraps an error raised by the command `name`.
    pub fn command(name: impl Into<String>, error: impl Into<BoxError>) -> Self {
        Self::Command {
            name: name.into(),
            source: error.into(),
        }
    }
}

/// Convenience alias for results with [`ConsoleError`].
pub type Result<T> = std::result::Result<T, ConsoleError>;
