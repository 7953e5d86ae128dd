use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use super::environ_getter::Getter;

/// Errors that can occur when registering environ getters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A getter with this name is already registered.
    #[error("an environ getter named {0:?} is already registered")]
    Duplicate(String),
}

/// A store that maps names to environ getters, with a resettable baseline.
///
/// The store keeps two ordered maps:
/// - the live getters, consulted by lookups
/// - the original getters, the baseline that [`reset`](Self::reset)
///   restores
///
/// Until the store is [sealed](Self::seal), every insertion is recorded in
/// both maps. After sealing, insertions only touch the live map, so runtime
/// overrides (for example, from tests) can be discarded with `reset`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tunables::datatypes;
/// use tunables::{ConvertingGetter, EnvironGetterStore, Getter};
///
/// let boolean: Getter =
///     Arc::new(ConvertingGetter::new("boolean", datatypes::boolean));
/// let mut store = EnvironGetterStore::new([("boolean", boolean)]);
/// store.seal();
///
/// store
///     .register(
///         "string",
///         Arc::new(ConvertingGetter::new("string", datatypes::string)),
///     )
///     .unwrap();
/// assert!(store.contains("string"));
///
/// store.reset();
/// assert!(!store.contains("string"));
/// assert!(store.contains("boolean"));
/// ```
#[derive(Clone, Default)]
pub struct EnvironGetterStore {
    getters: IndexMap<String, Getter>,
    original: IndexMap<String, Getter>,
    sealed: bool,
}

impl EnvironGetterStore {
    /// Creates an unsealed store holding the provided getters.
    ///
    /// Later entries with a repeated name replace earlier ones.
    pub fn new<T, N>(getters: T) -> Self
    where
        T: IntoIterator<Item = (N, Getter)>,
        N: Into<String>,
    {
        let mut store = Self::default();
        for (name, getter) in getters {
            store.insert(name, getter);
        }
        store
    }

    /// Registers a getter under a name that must not be in use yet.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        getter: Getter,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.getters.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.insert(name, getter);
        Ok(())
    }

    /// Inserts a getter, replacing and returning any getter already
    /// registered under `name`.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        getter: Getter,
    ) -> Option<Getter> {
        let name = name.into();
        if !self.sealed {
            self.original.insert(name.clone(), getter.clone());
        }
        self.getters.insert(name, getter)
    }

    /// Freezes the baseline that [`reset`](Self::reset) restores.
    pub fn seal(&mut self) { self.sealed = true; }

    pub fn is_sealed(&self) -> bool { self.sealed }

    /// Discards everything but the baseline.
    ///
    /// Getters added after sealing are removed and getters replaced after
    /// sealing are restored. Calling this repeatedly has no further effect.
    pub fn reset(&mut self) {
        self.getters.clear();
        self.getters
            .extend(self.original.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Looks up a getter by name.
    pub fn get(&self, name: &str) -> Option<&Getter> { self.getters.get(name) }

    pub fn contains(&self, name: &str) -> bool {
        self.getters.contains_key(name)
    }

    /// Iterates over `(name, getter)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Getter)> {
        self.getters.iter().map(|(name, getter)| (name.as_str(), getter))
    }

    /// The registered names, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.getters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.getters.len() }

    pub fn is_empty(&self) -> bool { self.getters.is_empty() }
}

impl fmt::Debug for EnvironGetterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<EnvironGetters {:?}>", self.names().collect::<Vec<_>>())
    }
}
