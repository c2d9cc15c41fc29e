//! Service definitions.
//!
//! A [`Definition`] tells the container how to create one service: a
//! factory, the arguments and references handed to it, tags used for group
//! discovery, and visibility flags that the removal passes act on.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::container::Container;
use crate::error::{BoxError, ContainerError, Result};

/// A resolved service instance.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Attributes attached to one tag occurrence.
pub type TagAttributes = BTreeMap<String, Value>;

/// Creates a service from its resolved definition.
pub type ServiceFactory = Arc<dyn Fn(&ServiceContext<'_>) -> Result<Service> + Send + Sync>;

/// What a factory sees when the container instantiates its service.
pub struct ServiceContext<'a> {
    id: &'a str,
    container: &'a Container,
    definition: &'a Definition,
}

impl<'a> ServiceContext<'a> {
    pub(crate) fn new(id: &'a str, container: &'a Container, definition: &'a Definition) -> Self {
        Self {
            id,
            container,
            definition,
        }
    }

    /// Id of the service being created.
    pub fn id(&self) -> &str {
        self.id
    }

    /// Container creating the service, for lookups outside the declared references.
    pub fn container(&self) -> &Container {
        self.container
    }

    /// Arguments with parameter placeholders already resolved.
    pub fn arguments(&self) -> &[Value] {
        &self.definition.arguments
    }

    /// Returns the argument at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::MissingArgument`] if the definition has
    /// fewer arguments.
    pub fn argument(&self, index: usize) -> Result<&Value> {
        self.definition
            .arguments
            .get(index)
            .ok_or_else(|| ContainerError::MissingArgument {
                id: self.id.to_string(),
                kind: "argument",
                index,
            })
    }

    /// Returns the service referenced at `index`.
    ///
    /// References are rewritten to their alias targets at compile time, so
    /// this works even when the referenced alias was private and removed.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::MissingArgument`] if the definition has
    /// fewer references, or any error raised while creating the referenced
    /// service.
    pub fn reference(&self, index: usize) -> Result<Service> {
        let id = self
            .definition
            .references
            .get(index)
            .ok_or_else(|| ContainerError::MissingArgument {
                id: self.id.to_string(),
                kind: "reference",
                index,
            })?;
        self.container.get(id)
    }

    /// Returns the service referenced at `index`, downcast to `T`.
    ///
    /// # Errors
    ///
    /// Same as [`reference`](Self::reference), plus
    /// [`ContainerError::ServiceTypeMismatch`] when the service is not a `T`.
    pub fn reference_as<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        let id = self
            .definition
            .references
            .get(index)
            .cloned()
            .unwrap_or_default();
        self.reference(index)?
            .downcast::<T>()
            .map_err(|_| ContainerError::ServiceTypeMismatch {
                id,
                expected: std::any::type_name::<T>(),
            })
    }
}

/// How to build one service.
///
/// # Examples
///
/// ```
/// use pli_container::{ContainerBuilder, Definition};
/// use serde_json::json;
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.set_parameter("greeting", json!("Hello"));
/// builder.set_definition(
///     "greeter",
///     Definition::new(|ctx| {
///         let greeting = ctx.argument(0)?.as_str().unwrap_or_default().to_string();
///         Ok(Greeter { greeting })
///     })
///     .with_argument(json!("%greeting%")),
/// );
///
/// let container = builder.compile().unwrap();
/// let greeter = container.get_as::<Greeter>("greeter").unwrap();
/// assert_eq!(greeter.greeting, "Hello");
/// ```
#[derive(Clone)]
pub struct Definition {
    factory: Option<ServiceFactory>,
    pub(crate) arguments: Vec<Value>,
    pub(crate) references: Vec<String>,
    tags: BTreeMap<String, Vec<TagAttributes>>,
    public: bool,
    shared: bool,
    is_abstract: bool,
}

impl Definition {
    /// Creates a definition whose factory returns a `T`.
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceContext<'_>) -> Result<T> + Send + Sync + 'static,
    {
        Self::from_factory(Arc::new(move |ctx: &ServiceContext<'_>| {
            factory(ctx).map(|service| Arc::new(service) as Service)
        }))
    }

    /// Creates a definition whose factory may fail with any error type.
    ///
    /// The error is wrapped in [`ContainerError::Factory`].
    pub fn fallible<T, E, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(&ServiceContext<'_>) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        Self::from_factory(Arc::new(move |ctx: &ServiceContext<'_>| {
            factory(ctx)
                .map(|service| Arc::new(service) as Service)
                .map_err(|source| ContainerError::Factory {
                    id: ctx.id().to_string(),
                    source: source.into(),
                })
        }))
    }

    /// Creates a definition from an already type-erased factory.
    pub fn from_factory(factory: ServiceFactory) -> Self {
        Self {
            factory: Some(factory),
            is_abstract: false,
            ..Self::template()
        }
    }

    /// Creates an abstract definition without a factory.
    ///
    /// Abstract definitions carry shared tags or arguments and are removed
    /// before the container is frozen.
    pub fn template() -> Self {
        Self {
            factory: None,
            arguments: Vec::new(),
            references: Vec::new(),
            tags: BTreeMap::new(),
            public: true,
            shared: true,
            is_abstract: true,
        }
    }

    pub fn with_argument(mut self, value: Value) -> Self {
        self.arguments.push(value);
        self
    }

    /// Declares a dependency on another service, reachable from the factory
    /// through [`ServiceContext::reference`].
    pub fn with_reference(mut self, id: impl Into<String>) -> Self {
        self.references.push(id.into());
        self
    }

    /// Adds a tag occurrence without attributes.
    pub fn with_tag(self, name: impl Into<String>) -> Self {
        self.with_tag_attributes(name, TagAttributes::new())
    }

    /// Adds a tag occurrence with attributes. A tag may occur several times.
    pub fn with_tag_attributes(mut self, name: impl Into<String>, attributes: TagAttributes) -> Self {
        self.tags.entry(name.into()).or_default().push(attributes);
        self
    }

    /// Marks the service as internal: it is removed at compile time unless
    /// another kept service references it.
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Creates a new instance on every `get` instead of memoising it.
    pub fn not_shared(mut self) -> Self {
        self.shared = false;
        self
    }

    pub fn set_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// Factory of the service. Abstract templates may have none.
    pub fn factory(&self) -> Option<&ServiceFactory> {
        self.factory.as_ref()
    }

    /// Argument values, resolved once the container is compiled.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Vec<Value> {
        &mut self.arguments
    }

    /// Ids of the services handed to the factory.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut Vec<String> {
        &mut self.references
    }

    /// Tags with the attributes of each occurrence.
    pub fn tags(&self) -> &BTreeMap<String, Vec<TagAttributes>> {
        &self.tags
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// Returns every attribute set recorded for tag `name`.
    pub fn tag(&self, name: &str) -> &[TagAttributes] {
        self.tags.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn clear_tag(&mut self, name: &str) {
        self.tags.remove(name);
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("has_factory", &self.factory.is_some())
            .field("arguments", &self.arguments)
            .field("references", &self.references)
            .field("tags", &self.tags)
            .field("public", &self.public)
            .field("shared", &self.shared)
            .field("abstract", &self.is_abstract)
            .finish()
    }
}

/// A second id for an existing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    target: String,
    public: bool,
}

impl Alias {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            public: true,
        }
    }

    /// Private aliases only exist to wire references and are removed at
    /// compile time.
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_public(&self) -> bool {
        self.public
    }
}
