//! # Audit Trail
//!
//! Writes the open / close pair of every business operation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Operation, Two Entries                           │
//! │                                                                         │
//! │  open()   ──► PROCESSING  (id stamp generated here)                    │
//! │     │                                                                   │
//! │     │   business work: one transaction per operation / per item        │
//! │     ▼                                                                   │
//! │  close()  ──► SUCCESS | FAILED  (same id stamp, consumes the handle)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Appends go through the pool after the business transaction is gone.
//! A failed append is logged and swallowed: the ledger change stands.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use stockroom_core::{Actor, AuditLogEntry, AuditStatus, CommandType, IdStamp};
use stockroom_db::AuditLogRepository;

use crate::context::OperationContext;

/// Handle for an operation whose open entry has been written.
///
/// Closing consumes it, so an operation cannot be closed twice.
#[derive(Debug)]
#[must_use = "an opened operation must be closed"]
pub struct OpenOperation {
    id_stamp: IdStamp,
    command_type: CommandType,
    actor: Actor,
    raw_command: String,
    parsed_details: Value,
}

impl OpenOperation {
    pub fn id_stamp(&self) -> &str {
        self.id_stamp.as_str()
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// Adds a field to the details carried by the close entry.
    pub fn note(&mut self, key: &str, value: impl Into<Value>) {
        if let Value::Object(map) = &mut self.parsed_details {
            map.insert(key.to_string(), value.into());
        }
    }

    fn entry(
        &self,
        status: AuditStatus,
        message: String,
        error_details: Option<Value>,
    ) -> AuditLogEntry {
        AuditLogEntry {
            seq: 0,
            id_stamp: self.id_stamp.to_string(),
            timestamp: Utc::now(),
            command_type: self.command_type,
            actor_id: self.actor.id.clone(),
            actor_name: self.actor.name.clone(),
            raw_command: self.raw_command.clone(),
            parsed_details: Some(self.parsed_details.clone()),
            status,
            message,
            error_details,
        }
    }
}

/// Audit log sink used by the engine.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    repo: AuditLogRepository,
}

impl AuditTrail {
    pub fn new(repo: AuditLogRepository) -> Self {
        Self { repo }
    }

    /// Generates the operation's id stamp and appends its PROCESSING entry.
    pub async fn open(
        &self,
        ctx: &OperationContext,
        command_type: CommandType,
        parsed_details: Value,
    ) -> OpenOperation {
        let op = OpenOperation {
            id_stamp: IdStamp::generate(command_type.id_prefix()),
            command_type,
            actor: ctx.actor.clone(),
            raw_command: ctx.raw_command.clone(),
            parsed_details,
        };

        debug!(
            id_stamp = %op.id_stamp,
            command_type = %command_type,
            actor = %ctx.actor.id,
            "Operation opened"
        );
        self.append(op.entry(AuditStatus::Processing, String::new(), None))
            .await;
        op
    }

    /// Appends the terminal entry.
    pub async fn close(
        &self,
        op: OpenOperation,
        status: AuditStatus,
        message: impl Into<String>,
        error_details: Option<Value>,
    ) {
        debug!(id_stamp = %op.id_stamp, status = %status, "Operation closed");
        self.append(op.entry(status, message.into(), error_details))
            .await;
    }

    async fn append(&self, entry: AuditLogEntry) {
        if let Err(e) = self.repo.append(&entry).await {
            warn!(
                id_stamp = %entry.id_stamp,
                status = %entry.status,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}
