use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::components::resolve_getter;
use crate::environ_getter::Shown;
use crate::getters_registry::DEFAULT_GETTER;
use crate::{ConvertingGetter, Getter, Logger};

/// Errors surfaced when reading a [`Tunable`].
#[derive(Debug, Error)]
pub enum TunableError {
    /// The tunable was configured with a getter name nothing resolves.
    #[error("no environ getter named {0:?} is registered")]
    UnknownGetter(String),
    /// The default value has no JSON representation, or does not survive
    /// the trip back into the tunable's type.
    #[error("the default value cannot be represented: {0}")]
    Default(#[source] serde_json::Error),
}

/// How a tunable chooses its getter: directly, or by registry name.
#[derive(Clone)]
pub enum GetterSpec {
    Direct(Getter),
    Named(String),
}

impl From<Getter> for GetterSpec {
    fn from(getter: Getter) -> Self { GetterSpec::Direct(getter) }
}

impl From<ConvertingGetter> for GetterSpec {
    fn from(getter: ConvertingGetter) -> Self {
        GetterSpec::Direct(Arc::new(getter))
    }
}

impl From<&str> for GetterSpec {
    fn from(name: &str) -> Self { GetterSpec::Named(name.to_owned()) }
}

impl From<String> for GetterSpec {
    fn from(name: String) -> Self { GetterSpec::Named(name) }
}

/// Derives the environment variable name for an attribute of an owning
/// type: `MODULE_OWNER_ATTRIBUTE`, uppercased, with `::` and `.` path
/// separators replaced by underscores.
///
/// ```
/// use tunables::derive_environ_name;
///
/// assert_eq!(
///     derive_environ_name("myapp::net", "Server", "POOL_SIZE"),
///     "MYAPP_NET_SERVER_POOL_SIZE"
/// );
/// ```
pub fn derive_environ_name(module_path: &str, owner: &str, attribute: &str) -> String {
    format!("{}_{}_{}", module_path, owner, attribute)
        .replace("::", "_")
        .replace('.', "_")
        .to_uppercase()
}

/// A setting that is either its default or a value from the environment.
///
/// The environment is consulted only the first time [`value`](Self::value)
/// is called; the result is cached for the lifetime of the tunable. Declared
/// through [`tunables!`](crate::tunables), a tunable lives in a `static`, so
/// every instance of the owning type sees the same value.
///
/// Values cross the getter boundary as [`Value`](crate::Value): the default
/// is serialized for the getter, and the getter's result is deserialized
/// back into `T`. A result that does not fit `T` is logged and replaced by
/// the default.
///
/// # Examples
///
/// ```
/// use tunables::Tunable;
///
/// let tunable = Tunable::new(42).with_env("TUNABLES_DOCTEST_TUNABLE");
/// assert_eq!(
///     tunable.to_string(),
///     "<Default: 42 Environment Variable: \"TUNABLES_DOCTEST_TUNABLE\">"
/// );
/// assert_eq!(tunable.value().unwrap(), &42);
/// assert_eq!(tunable.cached_value(), Some(&42));
/// ```
pub struct Tunable<T> {
    default: T,
    environ_name: OnceCell<String>,
    getter: Option<Getter>,
    getter_name: Option<String>,
    logger: Logger,
    value: OnceCell<T>,
}

impl<T> Tunable<T> {
    /// Creates an unbound tunable that reads a positive integer.
    pub fn new(default: T) -> Self {
        Self {
            default,
            environ_name: OnceCell::new(),
            getter: Some(Arc::new(DEFAULT_GETTER)),
            getter_name: Some(DEFAULT_GETTER.key().to_owned()),
            logger: Logger::default(),
            value: OnceCell::new(),
        }
    }

    /// Fixes the environment variable name, so binding will not derive one.
    pub fn with_env(self, environ_name: impl Into<String>) -> Self {
        Self { environ_name: OnceCell::with_value(environ_name.into()), ..self }
    }

    /// Chooses the getter.
    ///
    /// A name is resolved immediately through
    /// [`resolve_getter`](crate::resolve_getter). If nothing answers to it,
    /// the tunable is still created, and reading it reports
    /// [`TunableError::UnknownGetter`].
    pub fn with_getter(mut self, getter: impl Into<GetterSpec>) -> Self {
        match getter.into() {
            GetterSpec::Direct(getter) => {
                self.getter_name = getter.name().map(str::to_owned);
                self.getter = Some(getter);
            }
            GetterSpec::Named(name) => {
                self.getter = resolve_getter(&name);
                self.getter_name = Some(name);
            }
        }
        self
    }

    pub fn with_logger(self, logger: Logger) -> Self { Self { logger, ..self } }

    /// Attaches the tunable to an attribute of an owning type.
    ///
    /// The first binding of a tunable without an explicit name derives one
    /// with [`derive_environ_name`]; later bindings change nothing. Returns
    /// the name in effect.
    pub fn bind(&self, module_path: &str, owner: &str, attribute: &str) -> &str {
        self.environ_name
            .get_or_init(|| derive_environ_name(module_path, owner, attribute))
    }

    pub fn default_value(&self) -> &T { &self.default }

    pub fn environ_name(&self) -> Option<&str> {
        self.environ_name.get().map(String::as_str)
    }

    /// The name the getter was requested or declared under, if any.
    pub fn getter_name(&self) -> Option<&str> { self.getter_name.as_deref() }

    pub fn logger(&self) -> &Logger { &self.logger }

    /// The cached value, if the tunable has been read.
    pub fn cached_value(&self) -> Option<&T> { self.value.get() }
}

impl<T> Tunable<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Returns the value, reading the environment on the first call only.
    ///
    /// Concurrent first calls are serialized: the getter runs once.
    pub fn value(&self) -> Result<&T, TunableError> {
        self.value.get_or_try_init(|| self.resolve())
    }

    fn resolve(&self) -> Result<T, TunableError> {
        let getter = self.getter.as_ref().ok_or_else(|| {
            TunableError::UnknownGetter(self.getter_name.clone().unwrap_or_default())
        })?;
        let default = serde_json::to_value(&self.default).map_err(TunableError::Default)?;
        let resolved = getter.get(self.environ_name(), &default, &self.logger);
        match serde_json::from_value(resolved) {
            Ok(value) => Ok(value),
            Err(error) => {
                self.logger.error(format_args!(
                    "Value from environ {} does not fit the tunable: {}",
                    Shown(self.environ_name()),
                    error
                ));
                serde_json::from_value(default).map_err(TunableError::Default)
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Display for Tunable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Default: {:?} Environment Variable: ", self.default)?;
        match self.environ_name() {
            Some(name) => write!(f, "{:?}>", name),
            None => f.write_str("None>"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Tunable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Declares tunables as associated items of an owning type.
///
/// Each entry `NAME: Type = default` may be followed by `env = "VAR"`,
/// `getter = "name"` (or any [`GetterSpec`](crate::GetterSpec)) and
/// `logger = Logger`, in any order. For each entry the macro generates
///
/// - `Owner::NAME()`, returning the `&'static Tunable<Type>` itself, and
/// - `owner.name()`, returning its value.
///
/// Without `env`, the variable name is derived from the module path, the
/// owner and the entry name (see
/// [`derive_environ_name`](crate::derive_environ_name)).
///
/// # Examples
///
/// ```
/// use tunables::tunables;
///
/// struct Server;
///
/// tunables! {
///     impl Server {
///         /// Worker threads. Default: 4.
///         pub WORKERS: u32 = 4;
///         pub IDLE_TIMEOUT: f64 = 30.0, getter = "duration", env = "TUNABLES_DOCTEST_IDLE";
///     }
/// }
///
/// assert_eq!(Server.workers().unwrap(), &4);
/// assert_eq!(Server.idle_timeout().unwrap(), &30.0);
/// assert_eq!(Server::IDLE_TIMEOUT().environ_name(), Some("TUNABLES_DOCTEST_IDLE"));
/// assert!(Server::WORKERS().environ_name().unwrap().ends_with("_SERVER_WORKERS"));
/// ```
#[macro_export]
macro_rules! tunables {
    (
        impl $owner:ident {
            $(
                $(#[$meta:meta])*
                $vis:vis $name:ident : $ty:ty = $default:expr $(, $key:ident = $value:expr)* ;
            )*
        }
    ) => {
        $crate::paste::paste! {
            impl $owner {
                $(
                    $(#[$meta])*
                    #[allow(non_snake_case)]
                    $vis fn $name() -> &'static $crate::Tunable<$ty> {
                        static TUNABLE: $crate::__private::Lazy<$crate::Tunable<$ty>> =
                            $crate::__private::Lazy::new(|| {
                                let tunable = $crate::Tunable::<$ty>::new($default)
                                    $(.[<with_ $key>]($value))*;
                                tunable.bind(
                                    ::core::module_path!(),
                                    ::core::stringify!($owner),
                                    ::core::stringify!($name),
                                );
                                tunable
                            });
                        &TUNABLE
                    }

                    $(#[$meta])*
                    $vis fn [<$name:lower>](
                        &self,
                    ) -> ::core::result::Result<&'static $ty, $crate::TunableError> {
                        Self::$name().value()
                    }
                )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn set_env(key: &str, value: &str) {
        // SAFETY: every test uses its own variable name.
        unsafe { std::env::set_var(key, value) }
    }

    #[test]
    fn test_value_is_read_once() {
        let key = "TUNABLES_TUNABLE_TEST_ONCE";
        let tunable = Tunable::new(42).with_env(key);
        assert!(tunable.cached_value().is_none());
        assert_eq!(tunable.value().unwrap(), &42);
        set_env(key, "12");
        assert_eq!(tunable.value().unwrap(), &42);

        let fresh = Tunable::new(42).with_env(key);
        assert_eq!(fresh.value().unwrap(), &12);
    }

    #[test]
    fn test_named_getter() {
        let key = "TUNABLES_TUNABLE_TEST_BOOLEAN";
        set_env(key, "1");
        let tunable = Tunable::new(false).with_env(key).with_getter("boolean");
        assert_eq!(tunable.getter_name(), Some("boolean"));
        assert_eq!(tunable.value().unwrap(), &true);
    }

    #[test]
    fn test_direct_getter() {
        let getter: Getter =
            Arc::new(|_: Option<&str>, _: &Value, _: &Logger| Value::from("direct"));
        let tunable = Tunable::new(String::new()).with_getter(getter);
        assert_eq!(tunable.getter_name(), None);
        assert_eq!(tunable.value().unwrap(), "direct");
    }

    #[test]
    fn test_unknown_getter_fails_on_first_read() {
        let tunable = Tunable::new(0).with_env("UNUSED").with_getter("no-such-getter");
        assert!(matches!(
            tunable.value(),
            Err(TunableError::UnknownGetter(name)) if name == "no-such-getter"
        ));
        assert!(tunable.cached_value().is_none());
    }

    #[test]
    fn test_mismatched_value_falls_back_to_default() {
        let key = "TUNABLES_TUNABLE_TEST_MISMATCH";
        set_env(key, "1.5");
        let tunable = Tunable::new(5_i64).with_env(key).with_getter("duration");
        assert_eq!(tunable.value().unwrap(), &5);
    }

    #[test]
    fn test_unbound_tunable_uses_default() {
        let tunable = Tunable::new(9_u8);
        assert_eq!(tunable.environ_name(), None);
        assert_eq!(tunable.value().unwrap(), &9);
        assert_eq!(tunable.to_string(), "<Default: 9 Environment Variable: None>");
    }

    #[test]
    fn test_bind_derives_name_once() {
        let tunable = Tunable::new(1);
        assert_eq!(tunable.bind("app::net", "Server", "POOL"), "APP_NET_SERVER_POOL");
        assert_eq!(tunable.bind("other", "Owner", "ATTR"), "APP_NET_SERVER_POOL");

        let explicit = Tunable::new(1).with_env("EXPLICIT");
        assert_eq!(explicit.bind("app", "Server", "POOL"), "EXPLICIT");
    }

    #[test]
    fn test_derive_environ_name_replaces_dots() {
        assert_eq!(
            derive_environ_name("nti.property.tests", "T", "prop"),
            "NTI_PROPERTY_TESTS_T_PROP"
        );
    }

    #[test]
    fn test_logger_defaults_and_overrides() {
        assert_eq!(Tunable::new(0).logger(), &Logger::default());
        let logger = Logger::new("custom");
        assert_eq!(Tunable::new(0).with_logger(logger.clone()).logger(), &logger);
    }

    #[cfg(feature = "stock-datatypes")]
    #[test]
    fn test_stock_getter_into_tuple() {
        let key = "TUNABLES_TUNABLE_TEST_INET";
        set_env(key, "192.168.1.1:80");
        let tunable = Tunable::new((String::new(), None::<u16>))
            .with_env(key)
            .with_getter("inet-address");
        assert_eq!(
            tunable.value().unwrap(),
            &("192.168.1.1".to_string(), Some(80))
        );
    }
}
