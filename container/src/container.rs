//! The compiled, read-only service container.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use serde_json::Value;
use tracing::debug;

use crate::builder::tagged_ids;
use crate::definition::{Definition, Service, ServiceContext, TagAttributes};
use crate::error::{ContainerError, Result};
use crate::parameters::ParameterBag;

/// Query surface of a resolved container.
///
/// Consumers such as the application builder only depend on this trait, so
/// they can be driven by a stub in tests.
pub trait ServiceContainer: Send + Sync {
    /// Returns a copy of a parameter value.
    fn get_parameter(&self, name: &str) -> Result<Value>;

    /// Returns `true` if `id` names a service or an alias.
    fn has(&self, id: &str) -> bool;

    /// Returns the service for `id`.
    fn get(&self, id: &str) -> Result<Service>;

    /// Returns the ids of services tagged `tag`, with the attributes of
    /// every occurrence of the tag.
    fn find_tagged_service_ids(&self, tag: &str) -> Vec<(String, Vec<TagAttributes>)>;
}

/// A compiled container.
///
/// Parameters and definitions are frozen. Shared services are created on
/// first use and memoised. Tagged ids are reported in ascending id order.
///
/// Private definitions that survive compilation (because a public service
/// references them or they carry a tag) stay fetchable with
/// [`get`](Self::get). Visibility only decides what the removal passes may
/// drop; [`has`](Self::has) still reports them.
pub struct Container {
    parameters: ParameterBag,
    definitions: BTreeMap<String, Definition>,
    aliases: BTreeMap<String, String>,
    instances: Mutex<HashMap<String, Service>>,
    /// Services being created, with the thread creating them.
    loading: Mutex<Vec<(ThreadId, String)>>,
}

impl Container {
    pub(crate) fn new(
        parameters: ParameterBag,
        definitions: BTreeMap<String, Definition>,
        aliases: BTreeMap<String, String>,
    ) -> Self {
        Self {
            parameters,
            definitions,
            aliases,
            instances: Mutex::new(HashMap::new()),
            loading: Mutex::new(Vec::new()),
        }
    }

    /// Returns a resolved parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ParameterNotFound`] if `name` is not set.
    pub fn parameter(&self, name: &str) -> Result<&Value> {
        self.parameters.get(name)
    }

    /// All resolved parameters.
    pub fn parameters(&self) -> &ParameterBag {
        &self.parameters
    }

    /// Returns `true` if `id` names a service or an alias, private or not.
    pub fn has(&self, id: &str) -> bool {
        self.definitions.contains_key(id) || self.aliases.contains_key(id)
    }

    /// Iterates over service ids in ascending order.
    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Returns `true` if a shared instance of `id` was already created.
    pub fn initialized(&self, id: &str) -> bool {
        let id = self.aliases.get(id).map_or(id, String::as_str);
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Returns the service for `id`, creating it if needed.
    ///
    /// Threads racing on the same shared service may each run its factory,
    /// but all of them receive the instance stored first.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ServiceNotFound`] for an unknown id,
    /// [`ContainerError::CircularReference`] when the factory of `id`
    /// (directly or indirectly) asks for `id` again, or any error raised by
    /// the factory.
    pub fn get(&self, id: &str) -> Result<Service> {
        let id = self.aliases.get(id).map_or(id, String::as_str);

        if let Some(service) = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return Ok(Arc::clone(service));
        }

        let definition = self
            .definitions
            .get(id)
            .ok_or_else(|| ContainerError::ServiceNotFound { id: id.to_string() })?;
        let factory = definition
            .factory()
            .ok_or_else(|| ContainerError::InvalidDefinition {
                id: id.to_string(),
                reason: "a concrete service needs a factory".to_string(),
            })?;

        let thread = thread::current().id();
        {
            let mut loading = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
            if loading.iter().any(|(owner, entry)| *owner == thread && entry == id) {
                let mut path: Vec<&str> = loading
                    .iter()
                    .filter(|(owner, _)| *owner == thread)
                    .map(|(_, entry)| entry.as_str())
                    .collect();
                path.push(id);
                return Err(ContainerError::CircularReference {
                    path: path.join(" -> "),
                });
            }
            loading.push((thread, id.to_string()));
        }

        debug!(service = id, "Creating service");
        let created = factory(&ServiceContext::new(id, self, definition));

        self.loading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(owner, entry)| !(*owner == thread && entry == id));
        let service = created?;

        if definition.is_shared() {
            let mut instances = self.instances.lock().unwrap_or_else(PoisonError::into_inner);
            let stored = instances
                .entry(id.to_string())
                .or_insert_with(|| Arc::clone(&service));
            return Ok(Arc::clone(stored));
        }
        Ok(service)
    }

    /// Returns the service for `id`, downcast to `T`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), plus [`ContainerError::ServiceTypeMismatch`]
    /// when the service is not a `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
        self.get(id)?
            .downcast::<T>()
            .map_err(|_| ContainerError::ServiceTypeMismatch {
                id: id.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Returns the ids of services tagged `tag`, in ascending id order.
    pub fn find_tagged_service_ids(&self, tag: &str) -> Vec<(String, Vec<TagAttributes>)> {
        tagged_ids(&self.definitions, tag)
    }
}

impl ServiceContainer for Container {
    fn get_parameter(&self, name: &str) -> Result<Value> {
        self.parameter(name).cloned()
    }

    fn has(&self, id: &str) -> bool {
        Container::has(self, id)
    }

    fn get(&self, id: &str) -> Result<Service> {
        Container::get(self, id)
    }

    fn find_tagged_service_ids(&self, tag: &str) -> Vec<(String, Vec<TagAttributes>)> {
        Container::find_tagged_service_ids(self, tag)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("parameters", &self.parameters)
            .field("services", &self.definitions.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}
