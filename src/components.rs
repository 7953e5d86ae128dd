//! The seam to an external named-component system.
//!
//! Applications that keep a component registry of their own can make it the
//! first place tunables look for named getters: implement
//! [`ComponentLookup`], install it with [`set_component_lookup`], and
//! populate it at startup with [`register_tunables`]. Names the installed
//! lookup does not know still resolve through [`ENVIRON_GETTERS`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::getters_registry::ENVIRON_GETTERS;
use crate::logger::DEFAULT_LOGGER;
use crate::Getter;

/// The interface kind under which environ getters are looked up.
pub const ENVIRON_GETTER_INTERFACE: &str = "environ-getter";

/// A named-component lookup consulted before [`ENVIRON_GETTERS`].
pub trait ComponentLookup: Send + Sync {
    /// Returns the component registered for `interface` under `name`.
    fn lookup(&self, interface: &str, name: &str) -> Option<Getter>;
}

/// A minimal in-memory component registry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tunables::*;
///
/// let components = Arc::new(ComponentRegistry::new());
/// let count = register_tunables(&components);
/// assert!(count >= 8);
///
/// let getter = components
///     .lookup(ENVIRON_GETTER_INTERFACE, "byte-size")
///     .unwrap();
/// assert_eq!(getter.name(), Some("byte-size"));
/// ```
#[derive(Default)]
pub struct ComponentRegistry {
    utilities: RwLock<HashMap<(String, String), Getter>>,
}

impl ComponentRegistry {
    pub fn new() -> Self { Self::default() }

    /// Registers `getter` for `interface` under `name`, replacing and
    /// returning any previous registration.
    pub fn register_utility(
        &self,
        interface: &str,
        name: &str,
        getter: Getter,
    ) -> Option<Getter> {
        self.utilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((interface.to_owned(), name.to_owned()), getter)
    }

    pub fn unregister_utility(&self, interface: &str, name: &str) -> Option<Getter> {
        self.utilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(interface.to_owned(), name.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.utilities.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl ComponentLookup for ComponentRegistry {
    fn lookup(&self, interface: &str, name: &str) -> Option<Getter> {
        self.utilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(interface.to_owned(), name.to_owned()))
            .cloned()
    }
}

static COMPONENT_LOOKUP: RwLock<Option<Arc<dyn ComponentLookup>>> =
    RwLock::new(None);

/// Installs the process-wide component lookup, returning the previous one.
pub fn set_component_lookup(
    lookup: Arc<dyn ComponentLookup>,
) -> Option<Arc<dyn ComponentLookup>> {
    COMPONENT_LOOKUP
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(lookup)
}

/// Removes the process-wide component lookup, returning it.
pub fn clear_component_lookup() -> Option<Arc<dyn ComponentLookup>> {
    COMPONENT_LOOKUP.write().unwrap_or_else(PoisonError::into_inner).take()
}

fn installed_lookup() -> Option<Arc<dyn ComponentLookup>> {
    COMPONENT_LOOKUP.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Registers every getter currently in [`ENVIRON_GETTERS`] with
/// `registry`, under the same names. Returns how many were registered.
///
/// Running it again re-registers the same getters, so it is safe to call
/// from every startup path.
pub fn register_tunables(registry: &ComponentRegistry) -> usize {
    let items = ENVIRON_GETTERS.items();
    for (name, getter) in &items {
        registry.register_utility(ENVIRON_GETTER_INTERFACE, name, getter.clone());
    }
    DEFAULT_LOGGER.debug(format_args!(
        "Registered {} environ getters as components",
        items.len()
    ));
    items.len()
}

/// Resolves a getter name: the installed component lookup first, then
/// [`ENVIRON_GETTERS`]. Returns `None` if neither knows the name.
pub fn resolve_getter(name: &str) -> Option<Getter> {
    installed_lookup()
        .and_then(|components| components.lookup(ENVIRON_GETTER_INTERFACE, name))
        .or_else(|| ENVIRON_GETTERS.lookup(name))
}
