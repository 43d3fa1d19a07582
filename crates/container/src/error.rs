//! Container Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Every variant's display text is shown to users as the
//! reason a file was skipped, so keep them readable.

use derive_more::{Display, Error};

/// A container error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be opened or read.
    #[display("unable to read file")]
    Unreadable,
    /// The file extension is not a supported container type.
    #[display("unsupported file type: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The container structure is broken (bad magic, truncated tables, ...).
    #[display("corrupt or truncated {_0} container")]
    Malformed(#[error(not(source))] &'static str),
    /// A split archive does not start at part zero or has a gap.
    #[display("split archive is missing part {_0}")]
    MissingPart(#[error(not(source))] u32),
    /// Neither embedded metadata nor the file name identify the title.
    #[display("no title id found in embedded metadata or file name")]
    MissingMetadata,
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending value.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Only I/O can change between attempts; a corrupt file stays corrupt.
        matches!(self, Self::Unreadable)
    }
}
