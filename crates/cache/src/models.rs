use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use nxshelf_container::models::ParsedContainer;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// What identifies a file's content for caching purposes.
///
/// For split archives the caller folds every part into one fingerprint
/// (summed size, newest modification time) keyed by part zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub path: PathBuf,
    pub size: u64,
    pub modified: OffsetDateTime,
}
impl Fingerprint {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }
}

pub(crate) fn path_key(path: &Path) -> Result<String, Error> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FileRow {
    pub path: String,
    pub file_size: i64,
    pub modified_ns: i64,
    pub container: String,
    pub scanned_at: i64,
}
impl FileRow {
    pub fn new(fingerprint: &Fingerprint, parsed: &ParsedContainer) -> Result<Self, Error> {
        Ok(Self {
            path: path_key(&fingerprint.path)?,
            file_size: i64::try_from(fingerprint.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            modified_ns: i64::try_from(fingerprint.modified.unix_timestamp_nanos())
                .or_raise(|| ErrorKind::InvalidData("modification time"))?,
            container: serde_json::to_string(parsed).or_raise(|| ErrorKind::InvalidData("container"))?,
            scanned_at: OffsetDateTime::now_utc().unix_timestamp(),
        })
    }

    /// Whether the stored row still describes the file on disk.
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        i64::try_from(fingerprint.size).is_ok_and(|size| size == self.file_size)
            && i64::try_from(fingerprint.modified.unix_timestamp_nanos()).is_ok_and(|ns| ns == self.modified_ns)
    }

    pub fn container(&self) -> Result<ParsedContainer, Error> {
        serde_json::from_str(&self.container).or_raise(|| ErrorKind::InvalidData("container"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxshelf_container::models::{ContainerFile, ContainerKind, Format, GameMetadata, TitleId};

    fn parsed(path: &str) -> ParsedContainer {
        ParsedContainer {
            file: ContainerFile {
                path: PathBuf::from(path),
                parts: vec![PathBuf::from(path)],
                format: Format::Nsp,
                kind: ContainerKind::Plain,
            },
            metadata: vec![GameMetadata::new(TitleId::new(0x0100000000010000), 0)],
        }
    }

    #[test]
    fn test_row_round_trips_container() {
        let fingerprint = Fingerprint::new("/games/a.nsp", 10, OffsetDateTime::UNIX_EPOCH);
        let row = FileRow::new(&fingerprint, &parsed("/games/a.nsp")).unwrap();
        assert_eq!(row.container().unwrap(), parsed("/games/a.nsp"));
        assert!(row.matches(&fingerprint));
    }

    #[test]
    fn test_row_detects_changes() {
        let fingerprint = Fingerprint::new("/games/a.nsp", 10, OffsetDateTime::UNIX_EPOCH);
        let row = FileRow::new(&fingerprint, &parsed("/games/a.nsp")).unwrap();
        assert!(!row.matches(&Fingerprint { size: 11, ..fingerprint.clone() }));
        let touched = fingerprint.modified + time::Duration::nanoseconds(1);
        assert!(!row.matches(&Fingerprint { modified: touched, ..fingerprint }));
    }
}
