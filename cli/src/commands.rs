//! Commands of the demo tool.

use std::io::Write;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches};
use pli_console::{COMMAND_TAG, Command, ConsoleError, ContainerBuilderExt};
use pli_container::{
    ContainerAware, ContainerBuilder, ContainerError, ContainerHolder, ServiceContainer,
    ServiceContext,
};
use serde::Serialize;
use serde_json::json;

/// Registers the demo commands.
pub fn register(container: &mut ContainerBuilder) -> pli_container::Result<()> {
    container
        .register_command("command.greet", |ctx| {
            Ok(GreetCommand {
                greeting: string_argument(ctx, 0)?,
                default_name: string_argument(ctx, 1)?,
            })
        })
        .arguments_mut()
        .extend([json!("%app.greeting%"), json!("%app.name%")]);

    container.register_command("command.config_show", |_| Ok(ConfigShowCommand::default()));
    container.register_command("command.services_list", |_| {
        Ok(ServicesListCommand::default())
    });
    Ok(())
}

fn string_argument(ctx: &ServiceContext<'_>, index: usize) -> pli_container::Result<String> {
    ctx.argument(index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ContainerError::InvalidDefinition {
            id: ctx.id().to_string(),
            reason: format!("argument {index} must be a string"),
        })
}

fn injected(holder: &ContainerHolder, command: &str) -> pli_console::Result<Arc<dyn ServiceContainer>> {
    holder
        .get()
        .ok_or_else(|| ConsoleError::command(command, "the container was not injected"))
}

/// Prints a greeting per name, or for the configured name.
struct GreetCommand {
    greeting: String,
    default_name: String,
}

impl Command for GreetCommand {
    fn name(&self) -> &str {
        "greet"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("greet")
            .about("Greets people with the configured greeting")
            .arg(
                Arg::new("names")
                    .action(ArgAction::Append)
                    .help("Who to greet (defaults to app.name)"),
            )
    }

    fn execute(&self, matches: &ArgMatches, out: &mut dyn Write) -> pli_console::Result<i32> {
        let names: Vec<&str> = match matches.get_many::<String>("names") {
            Some(names) => names.map(String::as_str).collect(),
            None => vec![self.default_name.as_str()],
        };
        for name in names {
            writeln!(out, "{}, {name}!", self.greeting)?;
        }
        Ok(0)
    }
}

/// Prints the merged configuration.
#[derive(Default)]
struct ConfigShowCommand {
    container: ContainerHolder,
}

impl Command for ConfigShowCommand {
    fn name(&self) -> &str {
        "config:show"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("config:show")
            .about("Prints the merged configuration")
            .arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Print JSON instead of YAML"),
            )
    }

    fn execute(&self, matches: &ArgMatches, out: &mut dyn Write) -> pli_console::Result<i32> {
        let config = injected(&self.container, self.name())?
            .get_parameter("app.config")
            .map_err(|err| ConsoleError::command(self.name(), err))?;

        let rendered = if matches.get_flag("json") {
            serde_json::to_string_pretty(&config)
                .map(|json| format!("{json}\n"))
                .map_err(|err| ConsoleError::command(self.name(), err))?
        } else {
            serde_yaml::to_string(&config).map_err(|err| ConsoleError::command(self.name(), err))?
        };
        write!(out, "{rendered}")?;
        Ok(0)
    }

    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        Some(self)
    }
}

impl ContainerAware for ConfigShowCommand {
    fn set_container(&self, container: Arc<dyn ServiceContainer>) {
        self.container.set(container);
    }
}

#[derive(Debug, Serialize)]
struct TaggedServiceEntry {
    id: String,
    occurrences: usize,
}

/// Lists the services carrying a tag.
#[derive(Default)]
struct ServicesListCommand {
    container: ContainerHolder,
}

impl Command for ServicesListCommand {
    fn name(&self) -> &str {
        "services:list"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("services:list")
            .about("Lists the services carrying a tag")
            .arg(
                Arg::new("tag")
                    .long("tag")
                    .default_value(COMMAND_TAG)
                    .help("Tag to look up"),
            )
            .arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Print JSON instead of one id per line"),
            )
    }

    fn execute(&self, matches: &ArgMatches, out: &mut dyn Write) -> pli_console::Result<i32> {
        let tag = matches
            .get_one::<String>("tag")
            .map(String::as_str)
            .unwrap_or(COMMAND_TAG);
        let entries: Vec<TaggedServiceEntry> = injected(&self.container, self.name())?
            .find_tagged_service_ids(tag)
            .into_iter()
            .map(|(id, attributes)| TaggedServiceEntry {
                id,
                occurrences: attributes.len(),
            })
            .collect();

        if matches.get_flag("json") {
            let json = serde_json::to_string_pretty(&entries)
                .map_err(|err| ConsoleError::command(self.name(), err))?;
            writeln!(out, "{json}")?;
        } else {
            for entry in &entries {
                writeln!(out, "{}", entry.id)?;
            }
        }
        Ok(0)
    }

    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        Some(self)
    }
}

impl ContainerAware for ServicesListCommand {
    fn set_container(&self, container: Arc<dyn ServiceContainer>) {
        self.container.set(container);
    }
}
