//! SQLite connection pools for the persistent token cache.
//!
//! Writes are funnelled through a one-connection writer pool; lookups use a
//! small read-only pool. WAL mode lets the two proceed concurrently.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

const READER_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Connect to `database_url` and bring the schema up to date.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;

        // The reader pool is read-only, so the schema must exist first.
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }

    /// Open a database file, creating its parent directory when missing.
    pub async fn open_file(path: &Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Self::new(&database_url(&path.display().to_string())).await
    }
}

pub fn database_url(path: &str) -> String {
    format!("sqlite://{path}?mode=rwc")
}

/// `$LARKIT_DATA_DIR/larkit.db`, else `~/.larkit/larkit.db`.
pub fn default_database_path() -> String {
    let data_dir = std::env::var("LARKIT_DATA_DIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.larkit")
    });
    format!("{data_dir}/larkit.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_create_only_the_cache_table() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open_file(&dir.path().join("test.db")).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations'",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();
        assert_eq!(tables, vec![("cache_entries".to_string(),)]);
    }

    #[tokio::test]
    async fn writer_runs_in_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open_file(&dir.path().join("wal.db")).await.unwrap();

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn open_file_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/larkit.db");
        DatabasePool::open_file(&path).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn default_path_names_the_database_file() {
        assert!(default_database_path().ends_with("/larkit.db"));
        assert_eq!(database_url("/tmp/x.db"), "sqlite:///tmp/x.db?mode=rwc");
    }
}
