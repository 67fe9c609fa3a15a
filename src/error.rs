use std::{fmt, result};

/// Classification of an [Error]. Every fallible path in this crate is
/// tagged with one of these so callers can match on failure category
/// without parsing the message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// node lookup by key found nothing.
    NodeNotFound,
    /// edge lookup by (source, target, type) found nothing.
    EdgeNotFound,
    /// supplied key or string attribute exceeds the configured width.
    KeyTooLong,
    /// a tree/slot invariant was violated; state may be partially updated.
    Integrity,
    /// a reopened file's header parameters disagree with the supplied config.
    SchemaMismatch,
    /// the backing file is already locked by another writer.
    Locked,
    /// malformed or truncated on-disk file.
    InvalidFile,
    /// bad caller input (out of range index, zero-sized config, ...).
    InvalidInput,
    /// conversion between integer/string representations failed.
    FailConvert,
    /// std::io error wrapping.
    IOError,
    /// should not happen; indicates a bug in this crate.
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error type returned by every fallible operation in this crate.
#[derive(Debug)]
pub struct Error(pub ErrorKind, pub String);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.0, self.1)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Build or wrap an [Error], tagging it with a [ErrorKind] and the
/// call-site location. Three call shapes:
///
/// * `err_at!(Kind, expr)` — `expr` is a `Result<T, E>` where `E: Display`;
///   maps the error branch into `Error`, passes the ok branch through.
/// * `err_at!(Kind, expr, "fmt", args...)` — same, with an extra formatted
///   message appended to the error.
/// * `err_at!(Kind, msg: "fmt", args...)` — constructs an `Err(Error)`
///   directly, no wrapped expression.
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err($crate::Error($crate::ErrorKind::$v, format!("{} {}", prefix, format!($($arg),+))))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err($crate::Error($crate::ErrorKind::$v, format!("{} {}", prefix, err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err($crate::Error($crate::ErrorKind::$v, format!("{} {} {}", prefix, msg, err)))
            }
        }
    }};
}

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;
