mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pli::{BootstrapError, ParameterFileExtension, Pli};
use pli_console::{COMMAND_TAG, ConsoleError};
use pli_container::{ContainerBuilder, ContainerError, FnPass, ServiceContainer};
use pli_core::{TreeNode, TreeSchema};
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");
const CONFIG_FILES: [&str; 2] = ["config.yml", "config.local.yml"];
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "pli-demo", version)]
#[command(about = "Example tool bootstrapped from a configuration directory")]
struct Cli {
    /// Directory holding config.yml, config.local.yml and parameters.yml.
    #[arg(long, env = "PLI_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,
    /// Override a container parameter (NAME=VALUE). May be repeated.
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
    defines: Vec<(String, String)>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
    /// Command to run, followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(BootstrapError::Console(ConsoleError::Arguments(err))) => err.exit(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { DEFAULT_LOG_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> pli::Result<i32> {
    let pli = Pli::new(&cli.config_dir).with_application("pli-demo", PACKAGE_VERSION);

    let config = pli.load_configuration(&config_schema(), CONFIG_FILES)?;
    let parameters = config_parameters(&config);
    let overrides = cli
        .defines
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)));

    let mut extension = ParameterFileExtension::new(commands::register);
    let builder = pli.build_container(
        &mut extension,
        parameters,
        overrides,
        vec![Box::new(FnPass::new("check-commands", check_commands))],
    )?;
    let container: Arc<dyn ServiceContainer> = Arc::new(builder.compile()?);

    let application = pli.get_application(container)?;
    let args = std::iter::once(application.name().to_string()).chain(cli.args);
    let mut stdout = std::io::stdout().lock();
    Ok(application.run(args, &mut stdout)?)
}

fn config_schema() -> TreeSchema {
    TreeSchema::new(
        TreeNode::mapping("app")
            .child(
                TreeNode::string("greeting")
                    .default_value(json!("Hello"))
                    .cannot_be_empty(),
            )
            .child(TreeNode::string("name").default_value(json!("world")))
            .child(TreeNode::sequence("friends", TreeNode::string("friend"))),
    )
}

/// Exposes the whole configuration as `app.config` and each top-level key
/// as `app.<key>`.
fn config_parameters(config: &Value) -> Vec<(String, Value)> {
    let mut parameters = vec![("app.config".to_string(), config.clone())];
    if let Value::Object(entries) = config {
        parameters.extend(
            entries
                .iter()
                .map(|(key, value)| (format!("app.{key}"), value.clone())),
        );
    }
    parameters
}

fn check_commands(container: &mut ContainerBuilder) -> pli_container::Result<()> {
    let commands = container.find_tagged_service_ids(COMMAND_TAG);
    if commands.is_empty() {
        return Err(ContainerError::pass("check-commands", "no command services left after compile"));
    }
    debug!(count = commands.len(), "Command services available");
    Ok(())
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got \"{raw}\"")),
    }
}
