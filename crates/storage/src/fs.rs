//! Absolute-path filesystem operations.
//!
//! Library entries can live in any of the configured scan folders, so moves
//! and deletions work on absolute paths rather than through a single
//! [`LocalBackend`](crate::LocalBackend) root.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Moves a file, creating the destination's parent folders.
///
/// Refuses to overwrite an existing destination. Falls back to copy-then-delete
/// when source and destination are on different filesystems.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::try_exists(to).await.map_err(|e| ErrorKind::from_io(e, to))? {
        exn::bail!(ErrorKind::AlreadyExists(to.to_path_buf()));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).await.map_err(|e| ErrorKind::from_io(e, parent))?;
    }
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(from = %from.display(), to = %to.display(), "Moving across filesystems; copying instead");
            fs::copy(from, to).await.map_err(|e| ErrorKind::from_io(e, from))?;
            Ok(fs::remove_file(from).await.map_err(|e| ErrorKind::from_io(e, from))?)
        },
        Err(e) => Err(ErrorKind::from_io(e, from).into()),
    }
}

/// Deletes a single file.
pub async fn remove_file(path: &Path) -> Result<()> {
    Ok(fs::remove_file(path).await.map_err(|e| ErrorKind::from_io(e, path))?)
}

pub async fn exists(path: &Path) -> Result<bool> {
    Ok(fs::try_exists(path).await.map_err(|e| ErrorKind::from_io(e, path))?)
}

/// Replaces `path` with `data` so that readers see either the old or the new
/// contents, never a partial write: the bytes go to a temporary file in the
/// same folder which is then renamed over the target.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let path = path.to_path_buf();
    let data = data.to_vec();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &data))
        .await
        .or_raise(|| ErrorKind::Io(io::Error::other("atomic write task failed")))?
}

fn write_atomic_blocking(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| ErrorKind::from_io(e, &parent))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| ErrorKind::from_io(e, &parent))?;
    tmp.write_all(data).map_err(ErrorKind::Io)?;
    tmp.as_file().sync_all().map_err(ErrorKind::Io)?;
    tmp.persist(path).map_err(|e| ErrorKind::from_io(e.error, path))?;
    Ok(())
}

/// Removes every empty folder below `root` (never `root` itself), deepest
/// first. Returns how many folders were removed.
pub async fn remove_empty_dirs(root: &Path) -> Result<usize> {
    let mut folders = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = fs::read_dir(&current).await.map_err(|e| ErrorKind::from_io(e, &current))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, &current))? {
            if entry.file_type().await.map_err(ErrorKind::Io)?.is_dir() {
                stack.push(entry.path());
                folders.push(entry.path());
            }
        }
    }
    // Deeper paths have more components; removing them first lets parents
    // become empty in the same pass.
    folders.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    let mut removed = 0;
    for folder in folders {
        let mut entries = fs::read_dir(&folder).await.map_err(|e| ErrorKind::from_io(e, &folder))?;
        if entries.next_entry().await.map_err(ErrorKind::Io)?.is_none() {
            fs::remove_dir(&folder).await.map_err(|e| ErrorKind::from_io(e, &folder))?;
            removed += 1;
        }
    }
    Ok(removed)
}
