//! # Audit Log Repository
//!
//! Append-only storage for [`AuditLogEntry`] rows.
//!
//! Appends go straight to the pool, outside any business transaction: an
//! operation that rolls back still leaves its open and close entries.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use stockroom_core::{AuditFilter, AuditLogEntry, AuditStatus, CommandType};

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    seq: i64,
    id_stamp: String,
    timestamp: DateTime<Utc>,
    command_type: CommandType,
    actor_id: String,
    actor_name: String,
    raw_command: String,
    parsed_details: Option<String>,
    status: AuditStatus,
    message: String,
    error_details: Option<String>,
}

impl AuditRow {
    fn into_entry(self) -> DbResult<AuditLogEntry> {
        let parsed_details = self
            .parsed_details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let error_details = self
            .error_details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(AuditLogEntry {
            seq: self.seq,
            id_stamp: self.id_stamp,
            timestamp: self.timestamp,
            command_type: self.command_type,
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            raw_command: self.raw_command,
            parsed_details,
            status: self.status,
            message: self.message,
            error_details,
        })
    }
}

/// Repository for the transaction log.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    /// Creates a new AuditLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogRepository { pool }
    }

    /// Appends an entry and returns its sequence number.
    pub async fn append(&self, entry: &AuditLogEntry) -> DbResult<i64> {
        let parsed_details = entry
            .parsed_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let error_details = entry
            .error_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (
                id_stamp, timestamp, command_type, actor_id, actor_name,
                raw_command, parsed_details, status, message, error_details
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id_stamp)
        .bind(entry.timestamp)
        .bind(entry.command_type.as_str())
        .bind(&entry.actor_id)
        .bind(&entry.actor_name)
        .bind(&entry.raw_command)
        .bind(parsed_details)
        .bind(entry.status.as_str())
        .bind(&entry.message)
        .bind(error_details)
        .execute(&self.pool)
        .await?;

        let seq = result.last_insert_rowid();
        debug!(
            id_stamp = %entry.id_stamp,
            status = %entry.status,
            seq,
            "Audit entry appended"
        );
        Ok(seq)
    }

    /// Reads entries matching `filter`, in append order.
    pub async fn query(&self, filter: &AuditFilter) -> DbResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT seq, id_stamp, timestamp, command_type, actor_id, actor_name,
                   raw_command, parsed_details, status, message, error_details
            FROM audit_log
            WHERE (?1 IS NULL OR id_stamp = ?1)
              AND (?2 IS NULL OR command_type = ?2)
              AND (?3 IS NULL OR actor_id = ?3)
              AND (?4 IS NULL OR status = ?4)
              AND (?5 IS NULL OR timestamp >= ?5)
              AND (?6 IS NULL OR timestamp <= ?6)
            ORDER BY seq ASC
            LIMIT ?7
            "#,
        )
        .bind(filter.id_stamp.as_deref())
        .bind(filter.command_type.map(|c| c.as_str()))
        .bind(filter.actor_id.as_deref())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.since)
        .bind(filter.until)
        // SQLite: negative LIMIT means no limit
        .bind(filter.limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditRow::into_entry).collect()
    }

    /// All entries of one operation.
    pub async fn entries_for(&self, id_stamp: &str) -> DbResult<Vec<AuditLogEntry>> {
        self.query(&AuditFilter {
            id_stamp: Some(id_stamp.to_string()),
            ..AuditFilter::default()
        })
        .await
    }
}
