//! Commands as container services.

use std::fmt;
use std::sync::Arc;

use pli_container::{ContainerBuilder, ContainerError, Definition, Service, ServiceContext};

use crate::command::Command;

/// Tag marking the services that become application commands.
pub const COMMAND_TAG: &str = "command";

/// The service stored in the container for a command.
///
/// Services are type-erased, so commands are wrapped in this concrete type
/// to be recoverable as `Arc<dyn Command>`.
#[derive(Clone)]
pub struct CommandService(Arc<dyn Command>);

impl CommandService {
    /// Wraps `command` as a container service.
    pub fn new(command: impl Command + 'static) -> Self {
        Self(Arc::new(command))
    }

    pub fn from_arc(command: Arc<dyn Command>) -> Self {
        Self(command)
    }

    /// The wrapped command.
    pub fn command(&self) -> &Arc<dyn Command> {
        &self.0
    }

    /// Extracts the command from a service fetched for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ServiceTypeMismatch`] if the service is not
    /// a [`CommandService`].
    pub fn from_service(id: &str, service: Service) -> pli_container::Result<Arc<dyn Command>> {
        service
            .downcast::<CommandService>()
            .map(|wrapped| Arc::clone(&wrapped.0))
            .map_err(|_| ContainerError::ServiceTypeMismatch {
                id: id.to_string(),
                expected: "command",
            })
    }
}

impl fmt::Debug for CommandService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandService").field(&self.0.name()).finish()
    }
}

/// Command registration helpers for [`ContainerBuilder`].
pub trait ContainerBuilderExt {
    /// Registers a public shared service tagged [`COMMAND_TAG`] whose
    /// factory builds the command.
    fn register_command<C, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Definition
    where
        C: Command + 'static,
        F: Fn(&ServiceContext<'_>) -> pli_container::Result<C> + Send + Sync + 'static;
}

impl ContainerBuilderExt for ContainerBuilder {
    fn register_command<C, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Definition
    where
        C: Command + 'static,
        F: Fn(&ServiceContext<'_>) -> pli_container::Result<C> + Send + Sync + 'static,
    {
        let definition =
            Definition::new(move |ctx: &ServiceContext<'_>| factory(ctx).map(CommandService::new))
                .with_tag(COMMAND_TAG);
        self.set_definition(id, definition)
    }
}
