//! Pure conversions from raw environment strings to dynamic values.
//!
//! Every function here has the [`Converter`] shape: it inspects a single raw
//! string and either produces a [`Value`] or explains why it could not. None
//! of them read the environment or log; that is the job of
//! [`setting_from_environ`](crate::setting_from_environ), which wraps a
//! converter with the fall-back-to-default behavior shared by all getters.
//!
//! The functions backing the built-in getters (`string`, `integer+`,
//! `integer0`, `float+`, `float0`, `boolean`, `duration`, `byte-size`) are
//! always available. The wider stock table used to fill in the remaining
//! getter names lives behind the `stock-datatypes` feature.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// A conversion from a raw environment string to a dynamic value.
pub type Converter = fn(&str) -> Result<Value, ConversionError>;

/// Errors produced when a raw string cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The text does not have the expected syntax.
    #[error("{value:?} is not a valid {kind}")]
    Invalid {
        /// The datatype that was expected.
        kind: &'static str,
        /// The offending raw text.
        value: String,
    },
    /// The text parsed but the value is outside the accepted bounds.
    #[error("{value} is out of range (must be {bound})")]
    OutOfRange {
        /// The parsed value, rendered.
        value: String,
        /// The bound that was violated, rendered.
        bound: String,
    },
    /// The environment value could not be read as UTF-8.
    #[error("environment value is not valid unicode")]
    NotUnicode,
    /// A filesystem-backed datatype pointed at something that is not there.
    #[error("{path:?} is not an existing {kind}")]
    MissingPath {
        /// The kind of filesystem object that was required.
        kind: &'static str,
        /// The offending raw path.
        path: String,
    },
}

fn invalid(kind: &'static str, raw: &str) -> ConversionError {
    ConversionError::Invalid { kind, value: raw.to_owned() }
}

fn check_minimum<N>(value: N, min: N) -> Result<N, ConversionError>
where
    N: PartialOrd + fmt::Display,
{
    if value < min {
        return Err(ConversionError::OutOfRange {
            value: value.to_string(),
            bound: format!(">= {}", min),
        });
    }
    Ok(value)
}

fn parse_integer(raw: &str) -> Result<i64, ConversionError> {
    raw.trim().parse::<i64>().map_err(|_| invalid("integer", raw))
}

fn parse_float(raw: &str) -> Result<f64, ConversionError> {
    let value = raw.trim().parse::<f64>().map_err(|_| invalid("float", raw))?;
    // Infinities and NaN have no JSON representation.
    if !value.is_finite() {
        return Err(invalid("float", raw));
    }
    Ok(value)
}

/// Returns the raw text unchanged; whitespace is preserved.
pub fn string(raw: &str) -> Result<Value, ConversionError> {
    Ok(Value::String(raw.to_owned()))
}

/// An integer greater than or equal to 1.
pub fn positive_integer(raw: &str) -> Result<Value, ConversionError> {
    Ok(check_minimum(parse_integer(raw)?, 1)?.into())
}

/// An integer greater than or equal to 0.
pub fn non_negative_integer(raw: &str) -> Result<Value, ConversionError> {
    Ok(check_minimum(parse_integer(raw)?, 0)?.into())
}

/// A finite float greater than or equal to 1.
pub fn positive_float(raw: &str) -> Result<Value, ConversionError> {
    Ok(check_minimum(parse_float(raw)?, 1.0)?.into())
}

/// A finite float greater than or equal to 0.
pub fn non_negative_float(raw: &str) -> Result<Value, ConversionError> {
    Ok(check_minimum(parse_float(raw)?, 0.0)?.into())
}

/// Parses a boolean flag.
///
/// `"0"` and `"1"` are accepted first; anything else must be one of the
/// words `yes`/`true`/`on` or `no`/`false`/`off`, in any case.
///
/// ```
/// use tunables::parse_boolean;
///
/// assert_eq!(parse_boolean("0"), Ok(false));
/// assert_eq!(parse_boolean("1"), Ok(true));
/// assert_eq!(parse_boolean("yes"), Ok(true));
/// assert_eq!(parse_boolean("Off"), Ok(false));
/// assert!(parse_boolean("maybe").is_err());
/// ```
pub fn parse_boolean(raw: &str) -> Result<bool, ConversionError> {
    match raw {
        "0" => return Ok(false),
        "1" => return Ok(true),
        _ => {}
    }
    match raw.to_lowercase().as_str() {
        "yes" | "true" | "on" => Ok(true),
        "no" | "false" | "off" => Ok(false),
        _ => Err(invalid("boolean", raw)),
    }
}

pub fn boolean(raw: &str) -> Result<Value, ConversionError> {
    parse_boolean(raw).map(Value::Bool)
}

const DURATION_MARKERS: [char; 6] = [' ', 'w', 'd', 'h', 'm', 's'];

/// A number of seconds, as a float.
///
/// Text containing a space or one of the unit letters is read with the
/// multi-part syntax of [`timedelta_seconds`], e.g. `1m 3.2s`; anything else
/// must be a bare float.
pub fn duration(raw: &str) -> Result<Value, ConversionError> {
    let seconds = if raw.contains(|c: char| DURATION_MARKERS.contains(&c)) {
        timedelta_seconds(raw)?
    } else {
        parse_float(raw).map_err(|_| invalid("duration", raw))?
    };
    Ok(seconds.into())
}

/// Reads whitespace-separated `<number><unit>` parts, with units `w`, `d`,
/// `h`, `m` and `s`, into a total number of seconds.
///
/// Numbers may be fractional or negative. A unit given twice keeps the last
/// amount. The total is rounded to whole microseconds.
///
/// ```
/// use tunables::datatypes::timedelta_seconds;
///
/// assert_eq!(timedelta_seconds("1m 3.2s"), Ok(63.2));
/// assert_eq!(timedelta_seconds("1w 1d"), Ok(691_200.0));
/// assert!(timedelta_seconds("Invalids").is_err());
/// ```
pub fn timedelta_seconds(raw: &str) -> Result<f64, ConversionError> {
    let (mut weeks, mut days, mut hours, mut minutes, mut seconds) =
        (0.0, 0.0, 0.0, 0.0, 0.0);
    for part in raw.split_whitespace() {
        let Some(unit) = part.chars().last() else {
            continue;
        };
        let amount = part[..part.len() - unit.len_utf8()]
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite())
            .ok_or_else(|| invalid("duration", raw))?;
        match unit {
            'w' => weeks = amount,
            'd' => days = amount,
            'h' => hours = amount,
            'm' => minutes = amount,
            's' => seconds = amount,
            _ => return Err(invalid("duration", raw)),
        }
    }
    let total = weeks * 604_800.0
        + days * 86_400.0
        + hours * 3_600.0
        + minutes * 60.0
        + seconds;
    Ok((total * 1_000_000.0).round() / 1_000_000.0)
}

fn suffix_multiplied(
    raw: &str,
    kind: &'static str,
    suffixes: &[(&str, i64)],
) -> Result<i64, ConversionError> {
    let lowered = raw.trim().to_lowercase();
    for (suffix, multiplier) in suffixes {
        if let Some(number) = lowered.strip_suffix(suffix) {
            let number = number
                .trim()
                .parse::<i64>()
                .map_err(|_| invalid(kind, raw))?;
            return number.checked_mul(*multiplier).ok_or_else(|| {
                ConversionError::OutOfRange {
                    value: raw.to_owned(),
                    bound: format!("<= {}", i64::MAX),
                }
            });
        }
    }
    lowered.parse::<i64>().map_err(|_| invalid(kind, raw))
}

const BYTE_SIZE_SUFFIXES: [(&str, i64); 3] =
    [("kb", 1 << 10), ("mb", 1 << 20), ("gb", 1 << 30)];

/// A byte count, with an optional `kB`, `MB` or `GB` suffix.
///
/// Suffixes are case-insensitive, may be separated from the number by
/// whitespace, and are powers of 1024. No bounds are applied.
pub fn byte_size(raw: &str) -> Result<Value, ConversionError> {
    suffix_multiplied(raw, "byte size", &BYTE_SIZE_SUFFIXES).map(Value::from)
}

#[cfg(feature = "stock-datatypes")]
pub use stock::*;

#[cfg(feature = "stock-datatypes")]
mod stock {
    use std::net::IpAddr;
    use std::path::PathBuf;

    use serde_json::{Value, json};

    use super::{
        ConversionError, Converter, invalid, parse_float, parse_integer,
        suffix_multiplied, timedelta_seconds,
    };

    /// The stock datatype table, in registration order.
    ///
    /// Names already claimed by a built-in getter (`string`, `boolean`,
    /// `byte-size`) are listed here too; the registry skips them.
    pub const STOCK_DATATYPES: &[(&str, Converter)] = &[
        ("string", super::string),
        ("boolean", super::boolean),
        ("byte-size", super::byte_size),
        ("integer", integer),
        ("float", float),
        ("null", null),
        ("identifier", identifier),
        ("dotted-name", dotted_name),
        ("dotted-suffix", dotted_suffix),
        ("basic-key", basic_key),
        ("port-number", port_number),
        ("inet-address", inet_address),
        ("inet-binding-address", inet_binding_address),
        ("inet-connection-address", inet_connection_address),
        ("ipaddr-or-hostname", ipaddr_or_hostname),
        ("existing-directory", existing_directory),
        ("existing-file", existing_file),
        ("existing-path", existing_path),
        ("existing-dirpath", existing_dirpath),
        ("time-interval", time_interval),
        ("timedelta", timedelta),
    ];

    pub fn integer(raw: &str) -> Result<Value, ConversionError> {
        parse_integer(raw).map(Value::from)
    }

    pub fn float(raw: &str) -> Result<Value, ConversionError> {
        parse_float(raw).map(Value::from)
    }

    pub fn null(raw: &str) -> Result<Value, ConversionError> {
        Ok(Value::String(raw.to_owned()))
    }

    fn is_identifier(text: &str) -> bool {
        let mut chars = text.chars();
        matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
            && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
    }

    fn is_dotted_name(text: &str) -> bool {
        text.split('.').all(is_identifier)
    }

    /// A Python-style identifier: `[_A-Za-z][_A-Za-z0-9]*`.
    pub fn identifier(raw: &str) -> Result<Value, ConversionError> {
        if !is_identifier(raw) {
            return Err(invalid("identifier", raw));
        }
        Ok(Value::String(raw.to_owned()))
    }

    /// Identifiers joined by dots, such as `package.module.name`.
    pub fn dotted_name(raw: &str) -> Result<Value, ConversionError> {
        if !is_dotted_name(raw) {
            return Err(invalid("dotted name", raw));
        }
        Ok(Value::String(raw.to_owned()))
    }

    /// A dotted name that may be relative (leading dot), or a lone `.`.
    pub fn dotted_suffix(raw: &str) -> Result<Value, ConversionError> {
        let relative = raw.strip_prefix('.').unwrap_or(raw);
        if raw != "." && !is_dotted_name(relative) {
            return Err(invalid("dotted suffix", raw));
        }
        Ok(Value::String(raw.to_owned()))
    }

    /// A case-insensitive key: `[A-Za-z][-._A-Za-z0-9]*`, lowercased.
    pub fn basic_key(raw: &str) -> Result<Value, ConversionError> {
        let mut chars = raw.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'));
        if !valid {
            return Err(invalid("basic key", raw));
        }
        Ok(Value::String(raw.to_lowercase()))
    }

    fn parse_port(raw: &str) -> Result<u16, ConversionError> {
        let port = parse_integer(raw)?;
        u16::try_from(port).map_err(|_| ConversionError::OutOfRange {
            value: port.to_string(),
            bound: format!("between 0 and {}", u16::MAX),
        })
    }

    pub fn port_number(raw: &str) -> Result<Value, ConversionError> {
        parse_port(raw).map(Value::from)
    }

    /// Parses `host:port`, `[v6-host]:port`, a bare port or a bare host into
    /// a `[host, port]` pair. An omitted port is `null`; an omitted host is
    /// replaced with `default_host`.
    fn parse_inet_address(
        raw: &str,
        default_host: &str,
    ) -> Result<Value, ConversionError> {
        let mut host = String::new();
        let mut port = None;
        if let Some((head, tail)) = raw.rsplit_once(':') {
            let (head, tail) = if head.len() >= 2
                && head.starts_with('[')
                && head.ends_with(']')
            {
                (&head[1..head.len() - 1], Some(tail))
            } else if head.contains(':') {
                // Unbracketed IPv6 literal; the last group is not a port.
                (raw, None)
            } else {
                (head, Some(tail))
            };
            if let Some(tail) = tail.filter(|tail| !tail.is_empty()) {
                port = Some(parse_port(tail)?);
            }
            host = head.to_lowercase();
        } else {
            match parse_port(raw) {
                Ok(bare_port) => port = Some(bare_port),
                Err(_) => {
                    if raw.split_whitespace().count() != 1 {
                        return Err(invalid("host name", raw));
                    }
                    host = raw.to_lowercase();
                }
            }
        }
        if host.is_empty() {
            host = default_host.to_owned();
        }
        Ok(json!([host, port]))
    }

    pub fn inet_address(raw: &str) -> Result<Value, ConversionError> {
        parse_inet_address(raw, "")
    }

    pub fn inet_binding_address(raw: &str) -> Result<Value, ConversionError> {
        parse_inet_address(raw, "")
    }

    pub fn inet_connection_address(raw: &str) -> Result<Value, ConversionError> {
        parse_inet_address(raw, "127.0.0.1")
    }

    fn is_hostname(text: &str) -> bool {
        !text.is_empty()
            && text.split('.').all(|label| {
                !label.is_empty()
                    && label.len() <= 63
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
    }

    /// An IPv4 or IPv6 literal, or a host name, lowercased.
    pub fn ipaddr_or_hostname(raw: &str) -> Result<Value, ConversionError> {
        let lowered = raw.to_lowercase();
        if lowered.parse::<IpAddr>().is_err() && !is_hostname(&lowered) {
            return Err(invalid("IP address or host name", raw));
        }
        Ok(Value::String(lowered))
    }

    fn expand_user(raw: &str) -> PathBuf {
        let home = || dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        if raw == "~" {
            home()
        } else if let Some(rest) = raw.strip_prefix("~/") {
            home().join(rest)
        } else {
            PathBuf::from(raw)
        }
    }

    fn existing(
        raw: &str,
        kind: &'static str,
        check: fn(&std::path::Path) -> bool,
    ) -> Result<Value, ConversionError> {
        if !check(&expand_user(raw)) {
            return Err(ConversionError::MissingPath { kind, path: raw.to_owned() });
        }
        Ok(Value::String(raw.to_owned()))
    }

    pub fn existing_directory(raw: &str) -> Result<Value, ConversionError> {
        existing(raw, "directory", |path| path.is_dir())
    }

    pub fn existing_file(raw: &str) -> Result<Value, ConversionError> {
        existing(raw, "file", |path| path.is_file())
    }

    pub fn existing_path(raw: &str) -> Result<Value, ConversionError> {
        existing(raw, "path", |path| path.exists())
    }

    /// A path whose parent directory exists; the path itself need not.
    pub fn existing_dirpath(raw: &str) -> Result<Value, ConversionError> {
        existing(raw, "parent directory", |path| match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        })
    }

    const TIME_INTERVAL_SUFFIXES: [(&str, i64); 4] =
        [("s", 1), ("m", 60), ("h", 3_600), ("d", 86_400)];

    /// Whole seconds with an optional `s`, `m`, `h` or `d` suffix.
    pub fn time_interval(raw: &str) -> Result<Value, ConversionError> {
        suffix_multiplied(raw, "time interval", &TIME_INTERVAL_SUFFIXES)
            .map(Value::from)
    }

    pub fn timedelta(raw: &str) -> Result<Value, ConversionError> {
        timedelta_seconds(raw).map(Value::from)
    }
}
