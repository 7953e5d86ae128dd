use std::env::{self, VarError};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::datatypes::{self, ConversionError, Converter};
use crate::logger::Logger;

/// A getter used by [`Tunable`](crate::Tunable) to read one setting.
///
/// Implementations read and convert the environment variable named
/// `environ_name`. If that cannot be done (the variable is missing or
/// malformed, or no name is known), they return `default`. Information is
/// logged through `logger`.
///
/// Any `Fn(Option<&str>, &Value, &Logger) -> Value` closure is an
/// `EnvironGetter`.
pub trait EnvironGetter: Send + Sync {
    fn get(
        &self,
        environ_name: Option<&str>,
        default: &Value,
        logger: &Logger,
    ) -> Value;

    /// The registry name this getter was declared with, if any.
    fn name(&self) -> Option<&str> { None }
}

/// A shared, type-erased environ getter.
pub type Getter = Arc<dyn EnvironGetter>;

impl<F> EnvironGetter for F
where
    F: Fn(Option<&str>, &Value, &Logger) -> Value + Send + Sync,
{
    fn get(
        &self,
        environ_name: Option<&str>,
        default: &Value,
        logger: &Logger,
    ) -> Value {
        self(environ_name, default, logger)
    }
}

impl fmt::Debug for dyn EnvironGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<EnvironGetter {:?}>", name),
            None => f.write_str("<EnvironGetter>"),
        }
    }
}

/// An environ getter that applies a [`Converter`] with the shared
/// resolution rules of [`setting_from_environ`].
///
/// # Examples
///
/// ```
/// use tunables::datatypes;
/// use tunables::{ConvertingGetter, EnvironGetter, Logger, Value};
///
/// const BOOLEAN: ConvertingGetter =
///     ConvertingGetter::new("boolean", datatypes::boolean);
///
/// // No variable name means nothing is read.
/// let value = BOOLEAN.get(None, &Value::Bool(true), &Logger::default());
/// assert_eq!(value, Value::Bool(true));
/// assert_eq!(BOOLEAN.name(), Some("boolean"));
/// ```
#[derive(Clone, Copy)]
pub struct ConvertingGetter {
    name: &'static str,
    converter: Converter,
}

impl ConvertingGetter {
    pub const fn new(name: &'static str, converter: Converter) -> Self {
        Self { name, converter }
    }

    /// The registry name, with its static lifetime.
    pub const fn key(&self) -> &'static str { self.name }

    pub fn converter(&self) -> Converter { self.converter }
}

impl EnvironGetter for ConvertingGetter {
    fn get(
        &self,
        environ_name: Option<&str>,
        default: &Value,
        logger: &Logger,
    ) -> Value {
        setting_from_environ(self.converter, environ_name, default, logger)
    }

    fn name(&self) -> Option<&str> { Some(self.name) }
}

impl fmt::Debug for ConvertingGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<EnvironGetter {:?}>", self.name)
    }
}

/// Reads `environ_name` from the process environment and converts it.
///
/// A missing variable (or a missing name) yields `default` without
/// attempting conversion. A value the converter rejects is logged at error
/// severity and also yields `default`. Whatever the outcome, the chosen
/// value is logged at info severity together with the raw value and the
/// default.
pub fn setting_from_environ(
    converter: Converter,
    environ_name: Option<&str>,
    default: &Value,
    logger: &Logger,
) -> Value {
    let raw = match environ_name.map(env::var) {
        None | Some(Err(VarError::NotPresent)) => Ok(None),
        Some(Ok(raw)) => Ok(Some(raw)),
        Some(Err(VarError::NotUnicode(_))) => Err(ConversionError::NotUnicode),
    };

    let result = match &raw {
        Ok(None) => default.clone(),
        Ok(Some(raw)) => converter(raw).unwrap_or_else(|error| {
            logger.error(format_args!(
                "Failed to parse environment value {:?} for key {}: {}",
                raw,
                Shown(environ_name),
                error
            ));
            default.clone()
        }),
        Err(error) => {
            logger.error(format_args!(
                "Failed to read environment value for key {}: {}",
                Shown(environ_name),
                error
            ));
            default.clone()
        }
    };

    let shown_raw = raw.ok().flatten();
    logger.info(format_args!(
        "Using value {} from environ {}={} (default={})",
        result,
        Shown(environ_name),
        Shown(shown_raw.as_deref()),
        default
    ));
    result
}

/// Quotes a present string and renders an absent one as `None`.
pub(crate) struct Shown<'a>(pub(crate) Option<&'a str>);

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(text) => write!(f, "{:?}", text),
            None => f.write_str("None"),
        }
    }
}

fn get_with(
    converter: Converter,
    environ_name: &str,
    default: Value,
    logger: Option<&Logger>,
) -> Value {
    let logger = logger.cloned().unwrap_or_default();
    setting_from_environ(converter, Some(environ_name), &default, &logger)
}

/// Returns the environment value unchanged; whitespace is preserved.
pub fn get_string_from_environ(
    environ_name: &str,
    default: impl Into<Value>,
    logger: Option<&Logger>,
) -> Value {
    get_with(datatypes::string, environ_name, default.into(), logger)
}

/// Returns an integer greater than or equal to 1 from the environment.
/// Other values are ignored in favor of `default`.
///
/// ```
/// use tunables::get_positive_integer_from_environ;
///
/// let value = get_positive_integer_from_environ(
///     "TUNABLES_DOCTEST_UNSET_INTEGER",
///     42,
///     None,
/// );
/// assert_eq!(value, 42);
/// ```
pub fn get_positive_integer_from_environ(
    environ_name: &str,
    default: impl Into<Value>,
    logger: Option<&Logger>,
) -> Value {
    get_with(datatypes::positive_integer, environ_name, default.into(), logger)
}

/// Returns an integer greater than or equal to 0 from the environment.
pub fn get_non_negative_integer_from_environ(
    environ_name: &str,
    default: impl Into<Value>,
    logger: Option<&Logger>,
) -> Value {
    get_with(datatypes::non_negative_integer, environ_name, default.into(), logger)
}

/// Returns a float greater than or equal to 1 from the environment.
pub fn get_positive_float_from_environ(
    environ_name: &str,
    default: impl Into<Value>,
    logger: Option<&Logger>,
) -> Value {
    get_with(datatypes::positive_float, environ_name, default.into(), logger)
}

/// Returns a float greater than or equal to 0 from the environment.
pub fn get_non_negative_float_from_environ(
    environ_name: &str,
    default: impl Into<Value>,
    logger: Option<&Logger>,
) -> Value {
    get_with(datatypes::non_negative_float, environ_name, default.into(), logger)
}

/// See [`parse_boolean`](crate::parse_boolean) for accepted values.
pub fn get_boolean_from_environ(
    environ_name: &str,
    default: impl Into<Value>,
    logger: Option<&Logger>,
) -> Value {
    get_with(datatypes::boolean, environ_name, default.into(), logger)
}

/// Returns a floating-point number of seconds, e.g. `1.24s`, `3m`, `1m 3.6s`.
pub fn get_duration_from_environ(
    environ_name: &str,
    default: impl Into<Value>,
    logger: Option<&Logger>,
) -> Value {
    get_with(datatypes::duration, environ_name, default.into(), logger)
}

/// Returns a byte quantity, given in bytes or with a `kB`, `MB` or `GB`
/// suffix. No constraints are applied to the value.
pub fn get_byte_size_from_environ(
    environ_name: &str,
    default: impl Into<Value>,
    logger: Option<&Logger>,
) -> Value {
    get_with(datatypes::byte_size, environ_name, default.into(), logger)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_env(key: &str, value: &str) {
        // SAFETY: every test uses its own variable name.
        unsafe { env::set_var(key, value) }
    }

    #[test]
    fn test_positive_integer_from_environ() {
        let key = "TUNABLES_TEST_POSITIVE_INTEGER";
        assert_eq!(get_positive_integer_from_environ(key, 42, None), 42);
        for (raw, expected) in
            [("1982", 1982), ("1", 1), ("0", 42), ("-5", 42), ("abc", 42)]
        {
            set_env(key, raw);
            assert_eq!(
                get_positive_integer_from_environ(key, 42, None),
                expected,
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_non_negative_integer_from_environ() {
        let key = "TUNABLES_TEST_NON_NEGATIVE_INTEGER";
        set_env(key, "0");
        assert_eq!(get_non_negative_integer_from_environ(key, 42, None), 0);
        set_env(key, "-1492");
        assert_eq!(get_non_negative_integer_from_environ(key, 42, None), 42);
    }

    #[test]
    fn test_floats_from_environ() {
        let key = "TUNABLES_TEST_FLOATS";
        assert_eq!(get_positive_float_from_environ(key, 42.0, None), 42.0);
        set_env(key, "1");
        assert_eq!(get_positive_float_from_environ(key, 42, None), 1.0);
        set_env(key, "0.0");
        assert_eq!(get_positive_float_from_environ(key, 42, None), 42);
        set_env(key, "2.3");
        assert_eq!(get_non_negative_float_from_environ(key, Value::Null, None), 2.3);
        set_env(key, "-2.3");
        assert_eq!(get_non_negative_float_from_environ(key, 1.0, None), 1.0);
    }

    #[test]
    fn test_string_from_environ_keeps_whitespace() {
        let key = "TUNABLES_TEST_STRING";
        assert_eq!(get_string_from_environ(key, 42, None), 42);
        set_env(key, " <a string> ");
        assert_eq!(get_string_from_environ(key, Value::Null, None), " <a string> ");
    }

    #[test]
    fn test_boolean_duration_and_byte_size_from_environ() {
        let key = "TUNABLES_TEST_MIXED";
        set_env(key, "on");
        assert_eq!(get_boolean_from_environ(key, Value::Null, None), true);
        set_env(key, "0");
        assert_eq!(get_boolean_from_environ(key, Value::Null, None), false);
        set_env(key, "1m 3.2s");
        assert_eq!(get_duration_from_environ(key, Value::Null, None), 63.2);
        set_env(key, "Invalid");
        assert_eq!(get_duration_from_environ(key, 42, None), 42);
        set_env(key, "1 kB");
        assert_eq!(get_byte_size_from_environ(key, Value::Null, None), 1024);
    }

    #[test]
    fn test_no_environ_name_yields_default() {
        let getter = ConvertingGetter::new("integer+", datatypes::positive_integer);
        let value = getter.get(None, &Value::from(7), &Logger::default());
        assert_eq!(value, 7);
    }

    #[test]
    fn test_closures_are_getters() {
        let getter: Getter =
            Arc::new(|_: Option<&str>, default: &Value, _: &Logger| {
                Value::from(default.as_i64().unwrap_or_default() * 2)
            });
        assert_eq!(getter.get(Some("IGNORED"), &Value::from(21), &Logger::default()), 42);
        assert!(getter.name().is_none());
        assert_eq!(format!("{:?}", getter), "<EnvironGetter>");
    }
}
