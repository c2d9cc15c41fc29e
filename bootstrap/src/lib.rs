//! Bootstrapper for Pli console applications.
//!
//! [`Pli`] wires the three startup stages of a tool together:
//!
//! - loading layered configuration files through a
//!   [`ConfigurationSchema`](pli_core::ConfigurationSchema);
//! - assembling a service container through an
//!   [`Extension`](pli_container::Extension) and extra compiler passes;
//! - building an [`Application`](pli_console::Application) from the
//!   container's command services.

mod bootstrap;
mod document;
mod error;
mod parameters;

pub use bootstrap::Pli;
pub use error::{BootstrapError, Result};
pub use parameters::ParameterFileExtension;
