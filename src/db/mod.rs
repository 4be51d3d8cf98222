//! Persistent storage.
//!
//! Async SQLite access through SQLx, holding accounts, active punishments,
//! the history log, and torrent postings. Startup loads everything into
//! memory; afterwards the worker pool mirrors mutations back here, each
//! worker on its own pooled connection.

pub mod accounts;
pub mod events;
pub mod torrents;

pub use accounts::AccountRow;
pub use events::{ActiveEventRow, HistoryRow};
pub use torrents::TorrentRow;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DbType;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("account not found: {0}")]
    AccountNotFound(String),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connection acquire timeout; keeps a wedged worker from blocking forever.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open (creating if needed) and migrate the database.
    pub async fn new(path: &str, dbtype: DbType) -> Result<Self, DbError> {
        let in_memory = path == ":memory:" || dbtype == DbType::Fallback;
        let options = if in_memory {
            // Shared cache so every pooled connection sees the same data.
            SqliteConnectOptions::new()
                .filename("file::memory:")
                .shared_cache(true)
                .create_if_missing(true)
        } else {
            let journal = match dbtype {
                DbType::Preferred => SqliteJournalMode::Wal,
                DbType::Alternate => SqliteJournalMode::Delete,
                DbType::Fallback => unreachable!("handled above"),
            };
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(journal)
                .busy_timeout(Duration::from_secs(5))
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        info!(path = %path, "Database connected");
        Self::run_migrations(&pool).await;
        Ok(Self { pool })
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check out a dedicated connection, used by each task runner for its
    /// working lifetime.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, DbError> {
        Ok(self.pool.acquire().await?)
    }

    /// Run the embedded migration, one statement at a time.
    async fn run_migrations(pool: &SqlitePool) {
        let migration = include_str!("../../migrations/001_init.sql");
        for statement in migration.split(';') {
            let sql: Vec<&str> = statement
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with("--"))
                .collect();
            if sql.is_empty() {
                continue;
            }
            let sql = sql.join("\n");
            if let Err(e) = sqlx::query(&sql).execute(pool).await {
                let err = e.to_string();
                if !err.contains("already exists") {
                    tracing::warn!(sql = %sql, error = %err, "Migration statement failed");
                }
            }
        }
        info!("Database migrations applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrates_in_memory() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(count, 0);
    }
}
