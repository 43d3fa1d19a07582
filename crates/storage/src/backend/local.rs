//! Local filesystem storage backend.
//!
//! Lists a scan folder using `tokio::fs` for async I/O. The folder must
//! already exist: an unreadable scan folder fails the whole operation rather
//! than silently producing an empty library.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend rooted at one scan folder.
///
/// # Examples
///
/// ```no_run
/// use nxshelf_storage::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("games", "/mnt/sd/games")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a backend for an existing, absolute folder.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidPath`] for relative paths,
    /// [`ErrorKind::NotFound`] when the folder does not exist and
    /// [`ErrorKind::NotADirectory`] when it is a file.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        // Non-async on purpose; it happens once per folder per scan.
        let metadata = std::fs::metadata(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(root));
        }
        Ok(Self { name: name.into(), root })
    }

    /// Convert an absolute path back to a path relative to the root.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative =
            absolute.strip_prefix(&self.root).or_raise(|| ErrorKind::InvalidPath(absolute.to_path_buf()))?;
        validate_path(relative)
    }

    fn metadata(path: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(FileInfo::new(PathBuf::from(path), metadata.len(), modified))
    }

    /// Keeps the stream loop free of error plumbing: every failure for a
    /// single entry comes back as one `Err` the loop can yield and move past.
    async fn process_entry(&self, entry: DirEntry, recursive: bool) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = fs::metadata(&path).await.map_err(|e| ErrorKind::from_io(e, &path))?;
        if metadata.is_dir() {
            return Ok(match recursive {
                true => WalkEntry::Descend(path),
                false => WalkEntry::Skip,
            });
        }
        if metadata.is_file() {
            let relative = self.relative_path(&path)?;
            return Ok(WalkEntry::File(Self::metadata(&relative, metadata)?));
        }
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn list_stream<'a>(&'a self, recursive: bool) -> FileInfoStream<'a> {
        let mut stack = vec![self.root.clone()];
        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::from_io(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(ErrorKind::from_io(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, recursive).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        // Broken symlinks and vanished files are not worth
                        // failing a whole folder listing over.
                        Err(e) if matches!(&*e, ErrorKind::NotFound(_)) => {
                            tracing::debug!(backend = %self.name, "Entry vanished during listing");
                        },
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }
}
