//! Verification log: one row per finished polling cycle

use chrono::{DateTime, Utc};
use reconciler_core::{Error, PollResult, Result, RuleKind};
use serde::Serialize;
use sqlx::SqlitePool;

/// What to write for a finished reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationEntry {
    pub scenario: String,
    pub field: String,
    pub rule: String,
    pub outcome: String,
    pub expected: Option<String>,
    pub observed: Option<String>,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

impl VerificationEntry {
    /// Summarize a poll outcome. The field name comes from the last pair
    /// when one exists, `field` otherwise.
    pub fn from_poll(scenario: &str, field: &str, rule: RuleKind, result: &PollResult) -> Self {
        let pair = result.last_pair();
        Self {
            scenario: scenario.to_string(),
            field: pair
                .map(|p| p.expected.field_name().to_string())
                .unwrap_or_else(|| field.to_string()),
            rule: rule.as_str().to_string(),
            outcome: result.state().to_string(),
            expected: pair.map(|p| p.expected.value().to_string()),
            observed: pair.map(|p| p.observed.value().to_string()),
            attempts: result.attempts(),
            elapsed_ms: result.elapsed().as_millis() as u64,
        }
    }
}

/// Stored log row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VerificationRecord {
    pub id: i64,
    pub scenario: String,
    pub field: String,
    pub rule: String,
    pub outcome: String,
    pub expected: Option<String>,
    pub observed: Option<String>,
    pub attempts: i64,
    pub elapsed_ms: i64,
    pub created_at: DateTime<Utc>,
}

pub async fn record_verification(pool: &SqlitePool, entry: &VerificationEntry) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO verification_log (scenario, field, rule, outcome, expected, observed, attempts, elapsed_ms, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.scenario)
    .bind(&entry.field)
    .bind(&entry.rule)
    .bind(&entry.outcome)
    .bind(&entry.expected)
    .bind(&entry.observed)
    .bind(entry.attempts as i64)
    .bind(entry.elapsed_ms as i64)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// Most recent entries first
pub async fn recent_verifications(pool: &SqlitePool, limit: i64) -> Result<Vec<VerificationRecord>> {
    sqlx::query_as(
        r#"
        SELECT id, scenario, field, rule, outcome, expected, observed, attempts, elapsed_ms, created_at
        FROM verification_log
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))
}
