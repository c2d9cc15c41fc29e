//! The application shell: a named set of commands dispatched through clap.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use clap::error::ErrorKind;
use tracing::{debug, info};

use crate::command::Command;
use crate::error::{ConsoleError, Result};

/// A console application holding commands keyed by name.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use std::sync::Arc;
///
/// use clap::ArgMatches;
/// use pli_console::{Application, Command, Result};
///
/// struct Ping;
///
/// impl Command for Ping {
///     fn name(&self) -> &str {
///         "ping"
///     }
///
///     fn execute(&self, _matches: &ArgMatches, out: &mut dyn Write) -> Result<i32> {
///         writeln!(out, "pong")?;
///         Ok(0)
///     }
/// }
///
/// let mut app = Application::new("tool", "1.0.0");
/// app.add(Arc::new(Ping)).unwrap();
///
/// let mut out = Vec::new();
/// assert_eq!(app.run(["tool", "ping"], &mut out).unwrap(), 0);
/// assert_eq!(String::from_utf8(out).unwrap(), "pong\n");
/// ```
pub struct Application {
    name: String,
    version: String,
    commands: BTreeMap<String, Arc<dyn Command>>,
}

impl Application {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            commands: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Registers a command under its name.
    ///
    /// Disabled commands are skipped without error.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::DuplicateCommand`] if an enabled command with
    /// the same name was already added.
    pub fn add(&mut self, command: Arc<dyn Command>) -> Result<()> {
        let name = command.name().to_string();
        if !command.is_enabled() {
            debug!(command = %name, "Skipped disabled command");
            return Ok(());
        }
        if self.commands.contains_key(&name) {
            return Err(ConsoleError::DuplicateCommand { name });
        }

        debug!(command = %name, "Registered command");
        self.commands.insert(name, command);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Returns the command registered as `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(name)
    }

    /// Iterates over registered commands in name order.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the root clap command with one subcommand per registered
    /// command.
    pub fn cli(&self) -> clap::Command {
        self.commands.values().fold(
            clap::Command::new(self.name.clone())
                .version(self.version.clone())
                .subcommand_required(true)
                .arg_required_else_help(true),
            |root, command| root.subcommand(command.definition().name(command.name().to_string())),
        )
    }

    /// Parses `args` (program name first) and runs the selected command.
    ///
    /// Help and version requests are written to `out` and yield exit code 0.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Arguments`] for any other parse failure, or
    /// the error raised by the command.
    pub fn run<I, T>(&self, args: I, out: &mut dyn Write) -> Result<i32>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.cli().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                write!(out, "{}", err.render())?;
                return Ok(0);
            }
            Err(err) => return Err(err.into()),
        };

        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| ConsoleError::UnknownCommand {
                name: String::new(),
            })?;
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| ConsoleError::UnknownCommand {
                name: name.to_string(),
            })?;

        info!(command = name, "Running command");
        command.execute(sub_matches, out)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}
