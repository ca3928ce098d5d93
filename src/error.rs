//! Top-level error taxonomy (§7): the handful of error kinds that don't
//! already live next to the component that raises them ([`FormatError`]
//! lives in [`crate::formats`], [`UnsafeFilterExpression`] in
//! [`crate::filter`]).
//!
//! `InvocationError` is what the CLI maps to exit code 1: an unknown
//! format tag, a missing required argument, or an unreadable path — all
//! caught before a single event is read, as opposed to [`FormatError`]
//! which can also fire mid-stream on framing corruption.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("cannot determine format for `{0}`: pass --from/--to explicitly")]
    UnknownFormat(PathBuf),
    #[error("unregistered format tag `{0}`")]
    UnregisteredFormat(String),
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),
    #[error("{0}")]
    BadArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Format(#[from] crate::formats::FormatError),
}
