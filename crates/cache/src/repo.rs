//! Repository for cached parse results.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{FileRow, Fingerprint, path_key};
use exn::ResultExt;
use nxshelf_container::models::ParsedContainer;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::instrument;

/// Reads and writes parse results keyed by [`Fingerprint`].
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the cached result for a file, but only while its size and
    /// modification time are unchanged. Unreadable rows count as a miss.
    #[instrument(level = "trace", skip(self, fingerprint), fields(path = %fingerprint.path.display()))]
    pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ParsedContainer>> {
        let row: Option<FileRow> = sqlx::query_as(include_str!("../queries/select_file.sql"))
            .bind(path_key(&fingerprint.path)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let Some(row) = row.filter(|row| row.matches(fingerprint)) else {
            return Ok(None);
        };
        match row.container() {
            Ok(container) => Ok(Some(container)),
            Err(err) => {
                tracing::warn!(path = %row.path, error = %err, "Discarding unreadable cache entry");
                Ok(None)
            },
        }
    }

    /// Stores (or replaces) the parse result for a file.
    pub async fn upsert(&self, fingerprint: &Fingerprint, parsed: &ParsedContainer) -> Result<()> {
        let row = FileRow::new(fingerprint, parsed)?;
        sqlx::query(include_str!("../queries/upsert_file.sql"))
            .bind(row.path)
            .bind(row.file_size)
            .bind(row.modified_ns)
            .bind(row.container)
            .bind(row.scanned_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Forgets a file. Returns whether a row was removed.
    pub async fn evict(&self, path: &Path) -> Result<bool> {
        let result = sqlx::query("DELETE FROM scanned_files WHERE path = ?1")
            .bind(path_key(path)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scanned_files")
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("row count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxshelf_container::models::{ContainerFile, ContainerKind, Format, GameMetadata, TitleId};
    use std::path::PathBuf;
    use time::OffsetDateTime;

    fn parsed(path: &str, version: u32) -> ParsedContainer {
        ParsedContainer {
            file: ContainerFile {
                path: PathBuf::from(path),
                parts: vec![PathBuf::from(path)],
                format: Format::Nsp,
                kind: ContainerKind::Plain,
            },
            metadata: vec![GameMetadata::new(TitleId::new(0x0100000000010800), version)],
        }
    }

    async fn repository() -> Repository {
        Repository::from(&Database::connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let repo = repository().await;
        let fingerprint = Fingerprint::new("/games/a.nsp", 1, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(repo.get(&fingerprint).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let repo = repository().await;
        let fingerprint = Fingerprint::new("/games/a.nsp", 1, OffsetDateTime::UNIX_EPOCH);
        repo.upsert(&fingerprint, &parsed("/games/a.nsp", 65536)).await.unwrap();
        repo.upsert(&fingerprint, &parsed("/games/a.nsp", 131072)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get(&fingerprint).await.unwrap(), Some(parsed("/games/a.nsp", 131072)));
    }

    #[tokio::test]
    async fn test_changed_file_is_a_miss() {
        let repo = repository().await;
        let fingerprint = Fingerprint::new("/games/a.nsp", 1, OffsetDateTime::UNIX_EPOCH);
        repo.upsert(&fingerprint, &parsed("/games/a.nsp", 0)).await.unwrap();
        let grown = Fingerprint { size: 2, ..fingerprint };
        assert_eq!(repo.get(&grown).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_evict() {
        let repo = repository().await;
        let fingerprint = Fingerprint::new("/games/a.nsp", 1, OffsetDateTime::UNIX_EPOCH);
        repo.upsert(&fingerprint, &parsed("/games/a.nsp", 0)).await.unwrap();
        assert!(repo.evict(Path::new("/games/a.nsp")).await.unwrap());
        assert!(!repo.evict(Path::new("/games/a.nsp")).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
