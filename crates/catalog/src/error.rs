//! Catalog Error Types
//!
//! Every kind here is fatal to the catalog load that raised it; nothing is
//! silently replaced with stale data.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[display("could not download {_0}")]
    Network(#[error(not(source))] String),
    /// The server answered with an unexpected status.
    #[display("downloading {url} failed with HTTP status {status}")]
    Http { status: u16, url: String },
    /// A document is not the JSON shape we expect.
    #[display("the {_0} document is malformed")]
    MalformedDocument(#[error(not(source))] &'static str),
    /// The local copy of a document could not be read or written.
    #[display("could not access the cached document at {_0}")]
    Cache(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedDocument(_) | Self::Cache(_) => false,
        }
    }
}
