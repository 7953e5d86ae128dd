//! Integration tests for tunables declared on owning types.

use tunables::{Logger, TunableError, tunables};

fn set_env(key: &str, value: &str) {
    // SAFETY: every test uses its own variable name.
    unsafe { std::env::set_var(key, value) }
}

struct Service;

struct Worker;

tunables! {
    impl Service {
        /// Connections kept open. Default: 4.
        pub POOL_SIZE: u32 = 4;
        pub RETRY_DELAY: f64 = 0.5, getter = "duration", env = "TUNABLE_DESCRIPTOR_RETRY_DELAY";
        pub VERBOSE: bool = false,
            getter = "boolean",
            env = "TUNABLE_DESCRIPTOR_VERBOSE",
            logger = Logger::new("tunable_descriptor::service");
        pub BANNER: String = "welcome".to_string(), getter = "string";
        pub BROKEN: u32 = 1, getter = "no-such-getter";
    }
}

tunables! {
    impl Worker {
        pub POOL_SIZE: u32 = 2;
    }
}

#[test]
fn test_environ_name_derived_from_module_owner_and_attribute() {
    assert_eq!(
        Service::POOL_SIZE().environ_name(),
        Some("TUNABLE_DESCRIPTOR_SERVICE_POOL_SIZE")
    );
    assert_eq!(
        Worker::POOL_SIZE().environ_name(),
        Some("TUNABLE_DESCRIPTOR_WORKER_POOL_SIZE")
    );
    assert_eq!(
        Service::RETRY_DELAY().environ_name(),
        Some("TUNABLE_DESCRIPTOR_RETRY_DELAY")
    );
}

#[test]
fn test_value_is_shared_by_all_instances_and_fixed_after_first_read() {
    set_env("TUNABLE_DESCRIPTOR_SERVICE_POOL_SIZE", "16");
    let first = Service;
    let second = Service;
    assert_eq!(first.pool_size().unwrap(), &16);

    set_env("TUNABLE_DESCRIPTOR_SERVICE_POOL_SIZE", "32");
    assert_eq!(second.pool_size().unwrap(), &16);
    assert_eq!(Service::POOL_SIZE().value().unwrap(), &16);
    assert!(std::ptr::eq(
        first.pool_size().unwrap(),
        second.pool_size().unwrap()
    ));
}

#[test]
fn test_type_level_access_exposes_the_tunable() {
    let tunable = Service::BANNER();
    assert_eq!(tunable.default_value(), "welcome");
    assert_eq!(tunable.getter_name(), Some("string"));
    assert_eq!(
        tunable.to_string(),
        "<Default: \"welcome\" Environment Variable: \"TUNABLE_DESCRIPTOR_SERVICE_BANNER\">"
    );
    assert_eq!(Service.banner().unwrap(), "welcome");
    assert_eq!(tunable.cached_value().map(String::as_str), Some("welcome"));
}

#[test]
fn test_named_getters_convert_environment_values() {
    set_env("TUNABLE_DESCRIPTOR_RETRY_DELAY", "1m 3.2s");
    assert_eq!(Service.retry_delay().unwrap(), &63.2);

    set_env("TUNABLE_DESCRIPTOR_VERBOSE", "on");
    assert_eq!(Service.verbose().unwrap(), &true);
    assert_eq!(
        Service::VERBOSE().logger().target(),
        "tunable_descriptor::service"
    );
}

#[test]
fn test_malformed_value_falls_back_to_default() {
    set_env("TUNABLE_DESCRIPTOR_WORKER_POOL_SIZE", "-5");
    assert_eq!(Worker.pool_size().unwrap(), &2);
}

#[test]
fn test_unknown_getter_surfaces_on_access() {
    let error = Service.broken().unwrap_err();
    assert!(matches!(&error, TunableError::UnknownGetter(name) if name == "no-such-getter"));
    assert_eq!(
        error.to_string(),
        "no environ getter named \"no-such-getter\" is registered"
    );
}
