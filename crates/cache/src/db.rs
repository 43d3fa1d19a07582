//! Connection pool management.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Scan workers write concurrently, but there is only ever one WAL writer.
const MAX_CONNECTIONS: u32 = 4;

/// Connection pool for the scan cache.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based PRAGMAs must run on every pooled connection, not
            // just the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Opens (creating if needed) the cache database at `path` and runs
    /// migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::base_options().filename(path.as_ref()).create_if_missing(true);
        Self::new(options, MAX_CONNECTIONS).await
    }

    /// Opens a throwaway in-memory database.
    ///
    /// Not gated behind `#[cfg(test)]` so dependent crates can use it in their
    /// own tests.
    pub async fn connect_in_memory() -> Result<Self> {
        // Every in-memory connection is its own database; one connection
        // keeps them all looking at the same data.
        Self::new(Self::base_options().filename(":memory:"), 1).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(1500))
    }

    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA cache_size = -4096;
                PRAGMA temp_store = MEMORY;
                PRAGMA wal_autocheckpoint = 800;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing cache migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for outstanding connections and closes the pool.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory_creates_schema() {
        let db = Database::connect_in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scanned_files").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 0);
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_after_connect_pragmas_are_applied() {
        let db = Database::connect_in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("PRAGMA wal_autocheckpoint").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 800);
        db.close().await;
    }

    #[tokio::test]
    async fn test_connect_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cache.sqlite");
        let db = Database::connect(&path).await.unwrap();
        db.close().await;
        assert!(path.exists());
    }
}
