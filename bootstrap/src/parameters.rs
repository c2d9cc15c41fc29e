//! An extension that seeds container parameters from a file.

use std::fmt;
use std::path::PathBuf;

use pli_container::{ContainerBuilder, ContainerError, Extension};
use serde_json::Value;
use tracing::debug;

use crate::document::read_document;

/// Default name of the parameter file.
pub const DEFAULT_PARAMETER_FILE: &str = "parameters.yml";

/// An [`Extension`] that reads container parameters from a file in the
/// configuration directories, then delegates service registration to a
/// closure.
///
/// The first directory containing the file wins. Each top-level key of the
/// file becomes a parameter. A missing file is not an error.
///
/// # Examples
///
/// ```
/// use pli_container::{ContainerBuilder, Definition, Extension};
/// use pli::ParameterFileExtension;
///
/// let mut extension = ParameterFileExtension::new(|container: &mut ContainerBuilder| {
///     container.set_definition("clock", Definition::new(|_| Ok(0_u64)));
///     Ok(())
/// });
/// extension.set_config_directories(vec!["/nonexistent".into()]);
///
/// let mut builder = ContainerBuilder::new();
/// extension.build_container(&mut builder).unwrap();
/// assert!(builder.has_definition("clock"));
/// ```
pub struct ParameterFileExtension<F> {
    filename: String,
    directories: Vec<PathBuf>,
    services: F,
}

impl<F> ParameterFileExtension<F>
where
    F: FnMut(&mut ContainerBuilder) -> pli_container::Result<()>,
{
    /// Creates an extension reading `parameters.yml` and then calling `services`.
    pub fn new(services: F) -> Self {
        Self {
            filename: DEFAULT_PARAMETER_FILE.to_string(),
            directories: Vec::new(),
            services,
        }
    }

    /// Reads parameters from `filename` instead of `parameters.yml`.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Directories searched for the parameter file, in order.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    fn load_parameters(&self, container: &mut ContainerBuilder) -> pli_container::Result<()> {
        for directory in &self.directories {
            let path = directory.join(&self.filename);
            let Some(document) = read_document(&path).map_err(ContainerError::extension)? else {
                continue;
            };

            let parameters = match document {
                Value::Object(parameters) => parameters,
                other => {
                    return Err(ContainerError::extension(format!(
                        "{} must contain a mapping, found {}",
                        path.display(),
                        pli_core::value_type_name(&other)
                    )));
                }
            };

            debug!(path = %path.display(), count = parameters.len(), "Loaded parameter file");
            for (name, value) in parameters {
                container.set_parameter(name, value);
            }
            return Ok(());
        }
        Ok(())
    }
}

impl<F> Extension for ParameterFileExtension<F>
where
    F: FnMut(&mut ContainerBuilder) -> pli_container::Result<()>,
{
    fn set_config_directories(&mut self, directories: Vec<PathBuf>) {
        self.directories = directories;
    }

    fn build_container(&mut self, container: &mut ContainerBuilder) -> pli_container::Result<()> {
        self.load_parameters(container)?;
        (self.services)(container)
    }
}

impl<F> fmt::Debug for ParameterFileExtension<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterFileExtension")
            .field("filename", &self.filename)
            .field("directories", &self.directories)
            .finish_non_exhaustive()
    }
}
