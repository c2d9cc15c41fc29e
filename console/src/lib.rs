//! Application shell for Pli tools.
//!
//! Commands implement [`Command`] and are collected into an
//! [`Application`], which parses the command line with `clap` and runs the
//! selected command. Commands registered in a container with
//! [`ContainerBuilderExt::register_command`] are discovered through the
//! [`COMMAND_TAG`] tag.

mod application;
mod command;
mod error;
mod service;

pub use application::Application;
pub use command::Command;
pub use error::{ConsoleError, Result};
pub use service::{COMMAND_TAG, CommandService, ContainerBuilderExt};
