//! Tunables: settings read from the environment once, and cached property
//! helpers.
//!
//! A [`Tunable`] is a setting with a default that may be overridden by an
//! environment variable. The variable is read the first time the value is
//! needed, converted by a named *environ getter*, and the result is kept
//! for the remainder of the process: later changes to the environment are
//! not observed.
//!
//! # Basic Usage
//!
//! ```rust
//! use tunables::tunables;
//!
//! struct Pool;
//!
//! tunables! {
//!     impl Pool {
//!         /// Maximum connections. Default: 10.
//!         pub MAX_CONNECTIONS: u32 = 10, env = "TUNABLES_DOCTEST_MAX_CONNECTIONS";
//!         /// Recycle idle connections. Default: `false`.
//!         pub RECYCLE: bool = false, getter = "boolean", env = "TUNABLES_DOCTEST_RECYCLE";
//!     }
//! }
//!
//! // Instances read the value...
//! assert_eq!(Pool.max_connections().unwrap(), &10);
//! assert_eq!(Pool.recycle().unwrap(), &false);
//!
//! // ...while the type exposes the tunable itself.
//! assert_eq!(
//!     Pool::MAX_CONNECTIONS().to_string(),
//!     "<Default: 10 Environment Variable: \"TUNABLES_DOCTEST_MAX_CONNECTIONS\">"
//! );
//! ```
//!
//! # Environ Getters
//!
//! Getters are addressed by name. The built-in names are `string`,
//! `integer+`, `integer0`, `float+`, `float0`, `boolean`, `duration` and
//! `byte-size`; with the `stock-datatypes` feature (default) the stock
//! datatypes such as `inet-address`, `dotted-name` or `timedelta` are
//! available as well. All of them live in [`ENVIRON_GETTERS`], which is
//! sealed after initialization so that [`LazyEnvironGetters::reset`] can
//! discard runtime additions.
//!
//! An application with its own component registry can install a
//! [`ComponentLookup`] that is consulted before [`ENVIRON_GETTERS`]:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tunables::*;
//!
//! let components = Arc::new(ComponentRegistry::new());
//! register_tunables(&components);
//! set_component_lookup(components.clone());
//!
//! assert!(resolve_getter("byte-size").is_some());
//! # clear_component_lookup();
//! ```
//!
//! # Property Helpers
//!
//! [`alias!`] and [`read_alias!`] expose a field under a second name.
//! [`LazyOnClass`] shares one computed value across every instance of a
//! type, and [`CachedProperty`] recomputes only when its inputs change.
//!
//! # Data URLs
//!
//! With the `data-url` feature (default), [`dataurl`] encodes and decodes
//! `data:` URLs.

mod logger;
pub use logger::{DEFAULT_LOGGER, Logger};

pub mod datatypes;
pub use datatypes::{ConversionError, Converter, parse_boolean};

mod environ_getter;
pub use environ_getter::*;

mod getter_store;
pub use getter_store::{EnvironGetterStore, RegistryError};

mod getters_registry;
pub use getters_registry::*;

mod components;
pub use components::{
    ComponentLookup, ComponentRegistry, ENVIRON_GETTER_INTERFACE,
    clear_component_lookup, register_tunables, resolve_getter,
    set_component_lookup,
};

mod tunable;
pub use tunable::{GetterSpec, Tunable, TunableError, derive_environ_name};

mod property;
pub use property::{CachedProperty, LazyOnClass};

#[cfg(feature = "data-url")]
pub mod dataurl;

pub use serde_json::Value;

#[doc(hidden)]
pub use paste;

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
