//! Test-account ledger
//!
//! Every registered account is kept here so accumulated test users can
//! be listed and flagged for bulk cleanup on the backend.

use crate::encryption::EncryptedSecret;
use chrono::{DateTime, Utc};
use reconciler_core::{Error, Language, Result, TestAccount};
use serde::Serialize;
use sqlx::SqlitePool;

/// Ledger entry (password stays encrypted)
#[derive(Debug, Clone, Serialize)]
pub struct LedgerAccount {
    pub id: i64,
    pub username: String,
    pub user_id: i64,
    pub language: Language,
    pub tag: String,
    pub seeded: bool,
    pub created_at: DateTime<Utc>,
    pub cleanup_requested: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    user_id: i64,
    language: String,
    tag: String,
    seeded: i32,
    created_at: DateTime<Utc>,
    cleanup_requested: i32,
}

impl TryFrom<AccountRow> for LedgerAccount {
    type Error = Error;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(LedgerAccount {
            id: row.id,
            language: row
                .language
                .parse()
                .map_err(|_| Error::DatabaseError(format!("bad language '{}' for {}", row.language, row.username)))?,
            username: row.username,
            user_id: row.user_id,
            tag: row.tag,
            seeded: row.seeded != 0,
            created_at: row.created_at,
            cleanup_requested: row.cleanup_requested != 0,
        })
    }
}

/// Record a provisioned account; usernames are unique
pub async fn record_account(
    pool: &SqlitePool,
    account: &TestAccount,
    tag: &str,
    password: &EncryptedSecret,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO accounts (username, user_id, language, password_encrypted, iv, tag, seeded, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&account.username)
    .bind(account.user_id)
    .bind(account.language.code())
    .bind(&password.ciphertext)
    .bind(&password.iv[..])
    .bind(tag)
    .bind(account.seeded as i32)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// List ledger accounts, newest first, optionally restricted to one tag
pub async fn list_accounts(pool: &SqlitePool, tag: Option<&str>) -> Result<Vec<LedgerAccount>> {
    let rows: Vec<AccountRow> = sqlx::query_as(
        r#"
        SELECT id, username, user_id, language, tag, seeded, created_at, cleanup_requested
        FROM accounts
        WHERE (?1 IS NULL OR tag = ?1)
        ORDER BY id DESC
        "#,
    )
    .bind(tag)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    rows.into_iter().map(LedgerAccount::try_from).collect()
}

/// Encrypted password of an account, if it is in the ledger
pub async fn get_account_password(pool: &SqlitePool, username: &str) -> Result<Option<EncryptedSecret>> {
    let row: Option<(Vec<u8>, Vec<u8>)> = sqlx::query_as(
        r#"
        SELECT password_encrypted, iv
        FROM accounts
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    match row {
        Some((ciphertext, iv)) => Ok(Some(
            EncryptedSecret::from_parts(ciphertext, &iv).map_err(|e| Error::DatabaseError(e.to_string()))?,
        )),
        None => Ok(None),
    }
}

/// Flag every non-seeded account with `tag` for cleanup. Returns how many
/// rows were newly flagged.
pub async fn mark_cleanup(pool: &SqlitePool, tag: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET cleanup_requested = 1
        WHERE tag = ? AND seeded = 0 AND cleanup_requested = 0
        "#,
    )
    .bind(tag)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected())
}

pub async fn count_accounts(pool: &SqlitePool, tag: Option<&str>) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE (?1 IS NULL OR tag = ?1)")
        .bind(tag)
        .fetch_one(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(count.0)
}
