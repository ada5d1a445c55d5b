//! # Engine
//!
//! Runs the warehouse operations against the ledger.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Every Business Operation                             │
//! │                                                                         │
//! │  1. audit.open()            PROCESSING entry, id stamp generated       │
//! │  2. db.begin()              one transaction (per item for batches)     │
//! │  3. read ─► plan (core) ─► guarded write                               │
//! │  4. tx.commit()             or drop = rollback on any error            │
//! │  5. audit.close()           SUCCESS | FAILED, exactly once             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Guarded writes (`quantity = previous`, `quantity >= n`, `status =
//! 'PENDING'`) turn a concurrent change between read and write into
//! `DbError::Conflict`; the transaction is dropped and nothing is applied.
//! Conflicts are reported, never retried.
//!
//! ## Module Organization
//! - [`stock`] - inbound, return, adjustment, outbound, cancel-outbound
//! - [`reservations`] - reserve, pick, return, cancel, pending list
//! - [`reports`] - read-only lookups and reports (not audited)

mod reports;
mod reservations;
mod stock;

pub use reports::DEFAULT_SEARCH_LIMIT;

use chrono::NaiveDate;
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::{error, info, warn};

use stockroom_core::{
    allocate, plan_delta, Allocation, AuditStatus, CommandType, DeltaMode, InventoryKey,
    InventoryRecord,
};
use stockroom_db::{Database, DbError, InventoryRepository, WriteStamp};

use crate::audit::{AuditTrail, OpenOperation};
use crate::config::EngineConfig;
use crate::context::OperationContext;
use crate::error::{EngineError, EngineResult};
use crate::outcome::{BatchReport, ItemEffect, ItemOutcome};

/// Inventory ledger, allocation and reservation engine.
///
/// Cheap to clone: clones share the same pool.
///
/// ## Usage
/// ```rust,ignore
/// let engine = Engine::connect(&config).await?;
/// let ctx = OperationContext::new(Actor::new("u1", "Ana"), config.inventory.clone());
///
/// let report = engine.outbound(&ctx, &[OutboundLine::new("SKU-1", 8, "order 77")]).await;
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    audit: AuditTrail,
}

impl Engine {
    pub fn new(db: Database) -> Self {
        let audit = AuditTrail::new(db.audit_log());
        Self { db, audit }
    }

    /// Validates `config`, opens the pool and runs migrations.
    pub async fn connect(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let db = Database::new(config.database.to_db_config()).await?;
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Audit helpers
    // =========================================================================

    /// Closes a single-shot operation from its result.
    async fn finish<T>(
        &self,
        op: OpenOperation,
        result: &EngineResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) {
        match result {
            Ok(value) => {
                let message = describe(value);
                info!(
                    id_stamp = %op.id_stamp(),
                    command_type = %op.command_type(),
                    "{}",
                    message
                );
                self.audit
                    .close(op, AuditStatus::Success, message, None)
                    .await;
            }
            Err(e) => {
                log_failure(op.id_stamp(), op.command_type(), None, e);
                let details = serde_json::to_value(e.detail()).ok();
                self.audit
                    .close(op, AuditStatus::Failed, e.to_string(), details)
                    .await;
            }
        }
    }

    /// Closes a multi-item operation.
    async fn finish_batch(&self, op: OpenOperation, items: Vec<ItemOutcome>) -> BatchReport {
        let report = BatchReport::new(op.id_stamp(), items);

        if report.is_success() {
            info!(
                id_stamp = %report.id_stamp,
                command_type = %op.command_type(),
                items = report.items.len(),
                "Batch applied"
            );
        } else {
            warn!(
                id_stamp = %report.id_stamp,
                command_type = %op.command_type(),
                applied = report.succeeded(),
                items = report.items.len(),
                "Batch finished with failures"
            );
        }

        let message = report.summary();
        let details = report.error_details();
        self.audit.close(op, report.status, message, details).await;
        report
    }

    /// Logs a failed item and wraps it.
    fn item_outcome(
        op: &OpenOperation,
        index: usize,
        sku: &str,
        result: EngineResult<ItemEffect>,
    ) -> ItemOutcome {
        if let Err(e) = &result {
            log_failure(op.id_stamp(), op.command_type(), Some(index), e);
        }
        ItemOutcome::new(index, sku, result)
    }
}

fn log_failure(id_stamp: &str, command_type: CommandType, item: Option<usize>, e: &EngineError) {
    if e.is_business() {
        warn!(id_stamp = %id_stamp, command_type = %command_type, item, code = %e.code(), "{}", e);
    } else {
        error!(id_stamp = %id_stamp, command_type = %command_type, item, code = %e.code(), "{}", e);
    }
}

// =============================================================================
// Transactional building blocks
// =============================================================================

fn stamp<'a>(ctx: &'a OperationContext, id_stamp: &'a str) -> WriteStamp<'a> {
    WriteStamp {
        actor_id: &ctx.actor.id,
        id_stamp,
        at: chrono::Utc::now(),
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Puts `quantity` onto `key`, creating the record with `inbound_date` if absent.
async fn receive_into(
    conn: &mut SqliteConnection,
    key: &InventoryKey,
    quantity: i64,
    inbound_date: NaiveDate,
    stamp: WriteStamp<'_>,
) -> EngineResult<InventoryRecord> {
    let current = InventoryRepository::find(conn, key).await?.map(|r| r.quantity);
    let plan = plan_delta(key, current, quantity, DeltaMode::Receive { inbound_date })?;
    Ok(InventoryRepository::apply(conn, key, plan, stamp).await?)
}

/// FIFO-allocates `quantity` of `sku` and deducts every line.
async fn allocate_and_deduct(
    conn: &mut SqliteConnection,
    sku: &str,
    quantity: i64,
    stamp: WriteStamp<'_>,
) -> EngineResult<Allocation> {
    let lots = InventoryRepository::available_lots(conn, sku).await?;
    let allocation = allocate(sku, quantity, &lots)?;

    for deduction in &allocation.deductions {
        let key = InventoryKey::new(sku, &deduction.lot, &deduction.location);
        InventoryRepository::deduct(conn, &key, deduction.quantity, stamp).await?;
    }

    Ok(allocation)
}

/// Parsed details are the request itself.
fn details_of<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn commit_error(e: sqlx::Error) -> EngineError {
    EngineError::Store(DbError::from(e))
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use stockroom_core::{Actor, AuditLogEntry};
    use stockroom_db::DbConfig;

    use super::*;
    use crate::config::InventorySettings;
    use crate::requests::ReceiptLine;

    pub async fn engine() -> Engine {
        Engine::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    pub fn ctx() -> OperationContext {
        OperationContext::new(Actor::new("u1", "Ana"), InventorySettings::default())
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// SKU "X": lot A (2025-01-01, 5) at L1 and lot B (2025-02-01, 10) at L2.
    pub async fn seeded() -> Engine {
        let engine = engine().await;
        let report = engine
            .inbound(
                &ctx(),
                &[
                    ReceiptLine::new("X", 5, "A", "L1", date(2025, 1, 1)),
                    ReceiptLine::new("X", 10, "B", "L2", date(2025, 2, 1)),
                ],
            )
            .await;
        assert!(report.is_success());
        engine
    }

    pub async fn quantity(engine: &Engine, lot: &str, location: &str) -> i64 {
        engine
            .lookup(&InventoryKey::new("X", lot, location))
            .await
            .unwrap()
            .map(|r| r.quantity)
            .unwrap_or(0)
    }

    pub async fn audit_for(engine: &Engine, id_stamp: &str) -> Vec<AuditLogEntry> {
        engine
            .database()
            .audit_log()
            .entries_for(id_stamp)
            .await
            .unwrap()
    }
}
