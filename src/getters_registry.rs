use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};

use crate::datatypes;
use crate::logger::DEFAULT_LOGGER;

use super::{ConvertingGetter, EnvironGetterStore, Getter, RegistryError};

/// A macro that declares a named environ getter at compile time.
///
/// This macro creates two constants:
/// - A `&str` constant with the suffix `_NAME` holding the registry name
/// - A [`ConvertingGetter`](crate::ConvertingGetter) constant pairing that
///   name with a converter
///
/// This is used internally to declare the built-in getters.
///
/// # Examples
///
/// ```
/// use tunables::*;
///
/// const_environ_getter!(MY_KEY_GETTER, "my-key", datatypes::string);
///
/// assert_eq!(MY_KEY_GETTER_NAME, "my-key");
/// assert_eq!(MY_KEY_GETTER.name(), Some("my-key"));
/// ```
#[macro_export]
macro_rules! const_environ_getter {
    ($const_name:ident, $name:expr, $converter:path) => {
        $crate::paste::paste! {
            pub const [<$const_name _NAME>]: &str = $name;
        }
        pub const $const_name: $crate::ConvertingGetter =
            $crate::ConvertingGetter::new($name, $converter);
    };
}

const_environ_getter!(STRING_GETTER, "string", datatypes::string);
const_environ_getter!(POSITIVE_INTEGER_GETTER, "integer+", datatypes::positive_integer);
const_environ_getter!(POSITIVE_FLOAT_GETTER, "float+", datatypes::positive_float);
const_environ_getter!(NON_NEGATIVE_INTEGER_GETTER, "integer0", datatypes::non_negative_integer);
const_environ_getter!(NON_NEGATIVE_FLOAT_GETTER, "float0", datatypes::non_negative_float);
const_environ_getter!(BOOLEAN_GETTER, "boolean", datatypes::boolean);
const_environ_getter!(DURATION_GETTER, "duration", datatypes::duration);
const_environ_getter!(BYTE_SIZE_GETTER, "byte-size", datatypes::byte_size);

/// The getter a [`Tunable`](crate::Tunable) uses unless told otherwise.
pub const DEFAULT_GETTER: ConvertingGetter = POSITIVE_INTEGER_GETTER;

/// A lazily initialized singleton that holds the process-wide getter
/// registry.
///
/// On first access the store is filled with the built-in getters, then with
/// every stock datatype whose name is still free, and sealed. Later
/// registrations are overlays that [`reset`](Self::reset) discards.
///
/// # Thread Safety
///
/// The store is protected by a mutex, and initialization is performed only
/// once across all threads using `std::sync::Once`. Lookups hand out
/// cloned [`Getter`] handles, so no lock is held while a getter runs.
#[doc(hidden)]
#[derive(Debug)]
pub struct LazyEnvironGetters {
    init: Once,
    data: Mutex<Option<EnvironGetterStore>>,
}

impl LazyEnvironGetters {
    /// Gets the global store, initializing it if necessary.
    pub fn get(&self) -> MutexGuard<'_, Option<EnvironGetterStore>> {
        self.init.call_once(|| {
            let mut store = EnvironGetterStore::new(
                [
                    STRING_GETTER,
                    POSITIVE_INTEGER_GETTER,
                    POSITIVE_FLOAT_GETTER,
                    NON_NEGATIVE_INTEGER_GETTER,
                    NON_NEGATIVE_FLOAT_GETTER,
                    BOOLEAN_GETTER,
                    DURATION_GETTER,
                    BYTE_SIZE_GETTER,
                ]
                .map(|getter| (getter.key(), Arc::new(getter) as Getter)),
            );

            #[cfg(feature = "stock-datatypes")]
            for &(name, converter) in datatypes::STOCK_DATATYPES {
                if !store.contains(name) {
                    store.insert(name, Arc::new(ConvertingGetter::new(name, converter)));
                }
            }

            store.seal();
            DEFAULT_LOGGER.debug(format_args!("Sealed {:?}", store));
            *self.lock() = Some(store);
        });
        self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<EnvironGetterStore>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_store<R>(&self, f: impl FnOnce(&mut EnvironGetterStore) -> R) -> R {
        let mut guard = self.get();
        f(guard.get_or_insert_with(EnvironGetterStore::default))
    }

    /// Looks up a getter by name.
    pub fn lookup(&self, name: &str) -> Option<Getter> {
        self.with_store(|store| store.get(name).cloned())
    }

    /// Registers a getter under a name that must not be in use yet.
    pub fn register(
        &self,
        name: impl Into<String>,
        getter: Getter,
    ) -> Result<(), RegistryError> {
        self.with_store(|store| store.register(name, getter))
    }

    /// Inserts a getter, replacing any getter already using `name`.
    pub fn insert(&self, name: impl Into<String>, getter: Getter) -> Option<Getter> {
        self.with_store(|store| store.insert(name, getter))
    }

    /// Restores the store to the sealed set of built-in and stock getters.
    pub fn reset(&self) {
        self.with_store(EnvironGetterStore::reset);
        DEFAULT_LOGGER.debug(format_args!("Reset environ getters"));
    }

    /// A snapshot of the registered `(name, getter)` pairs, in order.
    pub fn items(&self) -> Vec<(String, Getter)> {
        self.with_store(|store| {
            store
                .iter()
                .map(|(name, getter)| (name.to_owned(), getter.clone()))
                .collect()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.with_store(|store| store.contains(name))
    }
}

/// The process-wide registry of named environ getters.
///
/// This is the fallback consulted by [`resolve_getter`](crate::resolve_getter)
/// when no component lookup is installed, or when the installed lookup does
/// not know a name. The same names are registered in both places by
/// [`register_tunables`](crate::register_tunables).
///
/// # Examples
///
/// ```
/// use tunables::*;
///
/// let getter = ENVIRON_GETTERS.lookup("byte-size").unwrap();
/// assert_eq!(getter.name(), Some("byte-size"));
///
/// let binding = ENVIRON_GETTERS.get();
/// let store = binding.as_ref().unwrap();
/// assert!(store.is_sealed());
/// ```
pub static ENVIRON_GETTERS: LazyEnvironGetters = LazyEnvironGetters {
    init: Once::new(),
    data: Mutex::new(None),
};
