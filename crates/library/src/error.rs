//! Library Error Types
//!
//! Only whole-operation failures surface here. Problems with a single file
//! are reported inside scan results and organize reports instead.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configured folder could not be listed.
    #[display("could not read folder {}", _0.display())]
    Folder(#[error(not(source))] PathBuf),
    /// A naming template does not compile or renders an empty name.
    #[display("invalid name template: {_0}")]
    InvalidTemplate(#[error(not(source))] String),
    /// The remote catalog could not be loaded.
    #[display("could not load the title catalog")]
    Catalog,
    /// The scan cache could not be opened.
    #[display("could not open the scan cache")]
    Cache,
    /// The operation was cancelled by the caller.
    #[display("operation cancelled")]
    Cancelled,
    /// A background task panicked or was aborted.
    #[display("background task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Folder(_) | Self::Catalog | Self::Task)
    }
}
