//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The settings file has an extension we cannot parse.
    #[display("unsupported settings file: {}", _0.display())]
    UnsupportedFile(#[error(not(source))] PathBuf),
    /// A provider failed or a value has the wrong type.
    #[display("could not load settings")]
    Load,
    /// The settings were loaded but describe an unusable setup.
    #[display("invalid settings: {_0}")]
    Invalid(#[error(not(source))] &'static str),
    /// No platform data directory could be determined.
    #[display("could not determine a data directory")]
    NoDataDir,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
