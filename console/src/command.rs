use std::io::Write;

use clap::ArgMatches;
use pli_container::ContainerAware;

use crate::error::Result;

/// A named unit of work exposed as a subcommand of an [`Application`].
///
/// [`Application`]: crate::Application
pub trait Command: Send + Sync {
    /// Subcommand name, unique within an application.
    fn name(&self) -> &str;

    /// Describes the arguments of the command.
    ///
    /// The application always renames the returned command to
    /// [`name`](Self::name).
    fn definition(&self) -> clap::Command {
        clap::Command::new(self.name().to_string())
    }

    /// Disabled commands are left out when added to an application.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Runs the command and returns its exit code.
    fn execute(&self, matches: &ArgMatches, out: &mut dyn Write) -> Result<i32>;

    /// Returns the container-aware view of this command, if it wants the
    /// container injected after construction.
    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        None
    }
}
