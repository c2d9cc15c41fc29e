//! Extensions populate a container builder with parameters, definitions and
//! passes.

use std::path::PathBuf;

use crate::builder::ContainerBuilder;
use crate::error::Result;

/// A unit of container configuration supplied by the application.
///
/// The assembler first tells the extension where configuration lives, then
/// lets it register everything it provides. Errors from user code should be
/// wrapped with [`ContainerError::extension`](crate::ContainerError::extension).
#[cfg_attr(test, mockall::automock)]
pub trait Extension {
    /// Receives the directories configuration files are read from.
    fn set_config_directories(&mut self, directories: Vec<PathBuf>);

    /// Registers parameters, definitions, aliases and compiler passes.
    fn build_container(&mut self, container: &mut ContainerBuilder) -> Result<()>;
}
