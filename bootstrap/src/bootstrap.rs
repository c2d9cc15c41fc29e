//! The bootstrapper.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pli_console::{Application, COMMAND_TAG, CommandService};
use pli_container::{CompilerPass, ContainerBuilder, Extension, PassType, ServiceContainer};
use pli_core::{ConfigurationSchema, Processor};
use serde_json::Value;
use tracing::{debug, info};

use crate::document::read_document;
use crate::error::Result;

/// Bootstraps a console application from a configuration directory.
///
/// The three stages are independent and usually run in order:
///
/// 1. [`load_configuration`](Self::load_configuration) reads and merges
///    configuration files against a schema;
/// 2. [`build_container`](Self::build_container) fills a container builder
///    through an [`Extension`];
/// 3. [`get_application`](Self::get_application) turns the services tagged
///    `command` of the compiled container into an [`Application`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use pli::Pli;
/// use pli_container::{ContainerBuilder, Extension, ServiceContainer};
/// use pli_core::{TreeNode, TreeSchema};
///
/// struct App;
///
/// impl Extension for App {
///     fn set_config_directories(&mut self, _directories: Vec<std::path::PathBuf>) {}
///
///     fn build_container(&mut self, _container: &mut ContainerBuilder) -> pli_container::Result<()> {
///         Ok(())
///     }
/// }
///
/// let pli = Pli::new("/etc/app");
/// let schema = TreeSchema::new(TreeNode::mapping("app").allow_extra_keys());
/// let config = pli.load_configuration(&schema, ["config.yml"]).unwrap();
///
/// let builder = pli
///     .build_container(&mut App, [("config".to_string(), config)], Vec::new(), Vec::new())
///     .unwrap();
/// let container: Arc<dyn ServiceContainer> = Arc::new(builder.compile().unwrap());
/// let application = pli.get_application(container).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Pli {
    config_dir: PathBuf,
    name: String,
    version: String,
}

impl Pli {
    /// Creates a bootstrapper reading configuration from `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            name: "pli".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Sets the name and version of the applications this bootstrapper
    /// creates.
    pub fn with_application(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    /// Directory configuration files are read from.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the path of the configuration file `filename`.
    pub fn config_filename(&self, filename: impl AsRef<Path>) -> PathBuf {
        self.config_dir.join(filename)
    }

    /// Loads `filenames` from the configuration directory, in order, and
    /// processes them against `schema`.
    ///
    /// Missing files are skipped. Values from later files take precedence.
    /// Without any readable file the result is the schema's finalized empty
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Read`](crate::BootstrapError::Read) when an
    /// existing file cannot be read, a parse error when it is malformed, or
    /// [`BootstrapError::Schema`](crate::BootstrapError::Schema) when the
    /// schema rejects the configuration.
    pub fn load_configuration<S, I>(&self, schema: &S, filenames: I) -> Result<Value>
    where
        S: ConfigurationSchema + ?Sized,
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let root = schema.build_tree();

        let mut documents = Vec::new();
        for filename in filenames {
            if let Some(document) = read_document(&self.config_filename(filename))? {
                documents.push(document);
            }
        }

        info!(
            config_dir = %self.config_dir.display(),
            documents = documents.len(),
            "Loading configuration"
        );
        Ok(Processor::process(root.as_ref(), documents)?)
    }

    /// Creates a container builder, seeds it with `parameters` and then
    /// `parameter_overrides`, lets `extension` populate it, and appends
    /// `extra_passes` after every other pass.
    ///
    /// The builder is returned uncompiled.
    ///
    /// # Errors
    ///
    /// Returns the extension's error unchanged.
    pub fn build_container<P, O>(
        &self,
        extension: &mut dyn Extension,
        parameters: P,
        parameter_overrides: O,
        extra_passes: Vec<Box<dyn CompilerPass>>,
    ) -> Result<ContainerBuilder>
    where
        P: IntoIterator<Item = (String, Value)>,
        O: IntoIterator<Item = (String, Value)>,
    {
        let mut builder = ContainerBuilder::new();

        for (name, value) in parameters {
            builder.set_parameter(name, value);
        }
        for (name, value) in parameter_overrides {
            debug!(parameter = %name, "Applied parameter override");
            builder.set_parameter(name, value);
        }

        extension.set_config_directories(vec![self.config_dir.clone()]);
        extension.build_container(&mut builder)?;

        for pass in extra_passes {
            builder.add_compiler_pass(pass, PassType::AfterRemoving);
        }

        info!(
            services = builder.definitions().count(),
            passes = builder.pass_config().len(),
            "Assembled container"
        );
        Ok(builder)
    }

    /// Creates an application holding every command of `container`.
    ///
    /// # Errors
    ///
    /// Same as [`add_commands`](Self::add_commands).
    pub fn get_application(&self, container: Arc<dyn ServiceContainer>) -> Result<Application> {
        let mut application = Application::new(self.name.clone(), self.version.clone());
        self.add_commands(&mut application, &container)?;
        Ok(application)
    }

    /// Adds the services tagged `command` to `application`, in the order the
    /// container reports them.
    ///
    /// Container-aware commands receive `container` before being added.
    ///
    /// # Errors
    ///
    /// Returns the error of a failed service lookup, a
    /// [`ServiceTypeMismatch`](pli_container::ContainerError::ServiceTypeMismatch)
    /// for a tagged service that is not a command, or the application's
    /// error for a duplicate command name.
    pub fn add_commands(
        &self,
        application: &mut Application,
        container: &Arc<dyn ServiceContainer>,
    ) -> Result<()> {
        for (id, _attributes) in container.find_tagged_service_ids(COMMAND_TAG) {
            let command = CommandService::from_service(&id, container.get(&id)?)?;
            if let Some(aware) = command.as_container_aware() {
                aware.set_container(Arc::clone(container));
            }
            debug!(service = %id, command = command.name(), "Adding command");
            application.add(command)?;
        }
        Ok(())
    }
}
