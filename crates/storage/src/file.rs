//! File metadata returned by folder listings.

use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// A file discovered in a library folder.
///
/// `path` is relative to the folder it was listed from; together with the
/// folder it gives the file's absolute location. Size and modification time
/// form the fingerprint used to decide whether a cached parse is still valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from the folder root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }

    /// The final path component, lossily converted for display and matching.
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// Lower-cased extension without the leading dot.
    pub fn extension(&self) -> Option<String> {
        self.path.extension().map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Resolves this entry against the folder it was listed from.
    pub fn absolute(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_extension() {
        let info = FileInfo::new("sub/Game [0100000000010000][v0].NSP", 10, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(info.file_name(), "Game [0100000000010000][v0].NSP");
        assert_eq!(info.extension().as_deref(), Some("nsp"));
        assert_eq!(info.absolute("/games"), PathBuf::from("/games/sub/Game [0100000000010000][v0].NSP"));
    }
}
