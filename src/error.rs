//! Error types for the closed failure conditions of the compiler core.

use thiserror::Error;

/// Errors raised by the format and encoding tables.
///
/// Graph-walk code returns `anyhow::Result` and wraps these where a closed
/// condition fires; everything else (missing optional children, empty scope
/// stacks) uses defined defaults instead of erroring.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShadeError {
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("unknown format code: {0}")]
    UnknownFormat(String),

    #[error("no format of length {0}")]
    BadLength(usize),

    #[error("format `{0}` has no component length")]
    NoLength(&'static str),
}
