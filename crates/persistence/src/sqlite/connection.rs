//! Ledger database: connection pool and schema

use reconciler_core::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Applied in order on every connect; each statement is idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        user_id INTEGER NOT NULL,
        language TEXT NOT NULL,
        password_encrypted BLOB NOT NULL,
        iv BLOB NOT NULL,
        tag TEXT NOT NULL,
        seeded INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL,
        cleanup_requested INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_accounts_tag ON accounts (tag)",
    r#"
    CREATE TABLE IF NOT EXISTS verification_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        scenario TEXT NOT NULL,
        field TEXT NOT NULL,
        rule TEXT NOT NULL,
        outcome TEXT NOT NULL,
        expected TEXT,
        observed TEXT,
        attempts INTEGER NOT NULL,
        elapsed_ms INTEGER NOT NULL,
        created_at TIMESTAMP NOT NULL
    )
    "#,
];

fn db_error(e: impl std::fmt::Display) -> Error {
    Error::DatabaseError(e.to_string())
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the ledger file, creating parent directories
    pub async fn connect(path: &Path) -> Result<Self> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent).await.map_err(db_error)?;
            }
            _ => {}
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::with_schema(pool).await
    }

    /// Private in-memory ledger; one connection so every query sees it
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(db_error)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::with_schema(pool).await
    }

    async fn with_schema(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(db_error)?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_reapplied_without_error() {
        let db = Database::connect_in_memory().await.unwrap();
        for statement in SCHEMA {
            sqlx::query(statement).execute(db.pool()).await.unwrap();
        }
        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('accounts', 'verification_log')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, 2);
    }
}
