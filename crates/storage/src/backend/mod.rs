//! Storage backend trait and implementations.
//!
//! A backend is one library folder: it can enumerate the files below it and
//! resolve template-generated relative paths to absolute locations inside it.

mod local;

pub use self::local::LocalBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for library folders.
///
/// # Path Handling
/// Paths handed to and returned from a backend are relative to its
/// [`root`](Self::root) and are validated with
/// [`validate_path`](crate::validate_path).
///
/// # Examples
///
/// ```
/// use nxshelf_storage::{StorageBackend, error::Result};
///
/// async fn total_size(backend: &dyn StorageBackend) -> Result<u64> {
///     let files = backend.list(true).await?;
///     Ok(files.iter().map(|f| f.size).sum())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Absolute path of the folder this backend serves.
    fn root(&self) -> &Path;

    /// Stream every regular file below the root. When `recursive` is false
    /// only the root's direct children are listed.
    fn list_stream<'a>(&'a self, recursive: bool) -> FileInfoStream<'a>;

    /// Collects [`list_stream()`](Self::list_stream) into a [`Vec`], failing
    /// on the first error.
    async fn list(&self, recursive: bool) -> Result<Vec<FileInfo>> {
        self.list_stream(recursive).try_collect().await
    }
}
