//! Service container for Pli applications.
//!
//! A [`ContainerBuilder`] collects parameters, service [`Definition`]s and
//! aliases, usually filled in by an [`Extension`]. Compiling it runs the
//! ordered [`PassConfig`] pipeline and freezes the result into a
//! [`Container`], which creates services lazily on first use.
//!
//! ```
//! use pli_container::{ContainerBuilder, Definition};
//! use serde_json::json;
//!
//! let mut builder = ContainerBuilder::new();
//! builder.set_parameter("name", json!("world"));
//! builder.set_definition(
//!     "greeting",
//!     Definition::new(|ctx| Ok(format!("Hello {}", ctx.argument(0)?.as_str().unwrap_or("?"))))
//!         .with_argument(json!("%name%"))
//!         .with_tag("message"),
//! );
//!
//! let container = builder.compile().unwrap();
//! assert_eq!(*container.get_as::<String>("greeting").unwrap(), "Hello world");
//! assert_eq!(container.find_tagged_service_ids("message")[0].0, "greeting");
//! ```

mod aware;
mod builder;
mod compiler;
mod container;
mod definition;
mod error;
mod extension;
mod parameters;
pub mod passes;

pub use aware::{ContainerAware, ContainerHolder};
pub use builder::ContainerBuilder;
pub use compiler::{CompilerPass, FnPass, PassConfig, PassType};
pub use container::{Container, ServiceContainer};
pub use definition::{Alias, Definition, Service, ServiceContext, ServiceFactory, TagAttributes};
pub use error::{BoxError, ContainerError, Result};
pub use extension::Extension;
pub use parameters::ParameterBag;
