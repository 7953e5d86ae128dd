use std::borrow::Cow;
use std::fmt;

/// A handle naming the `log` target that tunables report through.
///
/// Every environ getter receives a `Logger` and uses it to record which
/// value was chosen for a setting and why. The handle is cheap to clone and
/// carries nothing but the target name; the actual sink is whatever logger
/// the application installed behind the [`log`] facade.
///
/// # Examples
///
/// ```
/// use tunables::Logger;
///
/// const SERVER_LOGGER: Logger = Logger::new("myapp::server");
/// assert_eq!(SERVER_LOGGER.target(), "myapp::server");
///
/// let dynamic = Logger::named(format!("myapp::{}", "worker"));
/// assert_eq!(dynamic.target(), "myapp::worker");
///
/// assert_eq!(Logger::default().target(), "tunables");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Logger {
    target: Cow<'static, str>,
}

/// The logger used when a tunable or getter is not given one.
pub const DEFAULT_LOGGER: Logger = Logger::new("tunables");

impl Logger {
    /// Creates a logger for a static target name.
    pub const fn new(target: &'static str) -> Self {
        Self { target: Cow::Borrowed(target) }
    }

    /// Creates a logger for a target name built at runtime.
    pub fn named(target: impl Into<String>) -> Self {
        Self { target: Cow::Owned(target.into()) }
    }

    /// Returns the `log` target this logger writes to.
    pub fn target(&self) -> &str { &self.target }

    /// Logs `args` at info severity.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        log::info!(target: self.target(), "{}", args);
    }

    /// Logs `args` at debug severity.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        log::debug!(target: self.target(), "{}", args);
    }

    /// Logs `args` at error severity.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        log::error!(target: self.target(), "{}", args);
    }
}

impl Default for Logger {
    fn default() -> Self { DEFAULT_LOGGER }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Logger {:?}>", self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logger_target() {
        assert_eq!(Logger::default(), DEFAULT_LOGGER);
        assert_eq!(Logger::default().target(), "tunables");
    }

    #[test]
    fn test_static_and_owned_targets_compare_equal() {
        assert_eq!(Logger::new("a::b"), Logger::named("a::b".to_string()));
        assert_eq!(format!("{:?}", Logger::new("a::b")), "<Logger \"a::b\">");
    }
}
