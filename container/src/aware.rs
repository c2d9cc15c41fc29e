//! Injection of the resolved container into services that ask for it.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::container::ServiceContainer;

/// Implemented by services that need the container handed to them after
/// they were created.
pub trait ContainerAware {
    fn set_container(&self, container: Arc<dyn ServiceContainer>);
}

/// A settable slot for the container, for types implementing
/// [`ContainerAware`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use pli_container::{ContainerAware, ContainerBuilder, ContainerHolder, ServiceContainer};
///
/// #[derive(Default)]
/// struct Report {
///     container: ContainerHolder,
/// }
///
/// impl ContainerAware for Report {
///     fn set_container(&self, container: Arc<dyn ServiceContainer>) {
///         self.container.set(container);
///     }
/// }
///
/// let report = Report::default();
/// assert!(report.container.get().is_none());
///
/// let container: Arc<dyn ServiceContainer> = Arc::new(ContainerBuilder::new().compile().unwrap());
/// report.set_container(Arc::clone(&container));
/// assert!(Arc::ptr_eq(&report.container.get().unwrap(), &container));
/// ```
#[derive(Default)]
pub struct ContainerHolder {
    slot: RwLock<Option<Arc<dyn ServiceContainer>>>,
}

impl ContainerHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `container`, replacing any earlier one.
    pub fn set(&self, container: Arc<dyn ServiceContainer>) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(container);
    }

    /// Returns the stored container, if one was set.
    pub fn get(&self) -> Option<Arc<dyn ServiceContainer>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns `true` once a container was injected.
    pub fn is_set(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for ContainerHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHolder")
            .field("set", &self.is_set())
            .finish()
    }
}
