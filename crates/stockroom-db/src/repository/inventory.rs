//! # Inventory Repository
//!
//! Stock records keyed by (sku, lot, location).
//!
//! ## FIFO Scan
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SELECT lot, location, quantity, inbound_date                          │
//! │  FROM inventory                                                        │
//! │  WHERE sku = 'SKU-1' AND quantity > 0                                  │
//! │  ORDER BY inbound_date ASC, rowid ASC                                  │
//! │                                                                         │
//! │  ┌──────┬──────────┬─────┬────────────┐                                │
//! │  │ lot  │ location │ qty │ inbound    │                                │
//! │  ├──────┼──────────┼─────┼────────────┤                                │
//! │  │ A    │ L1       │ 5   │ 2025-01-01 │ ← consumed first               │
//! │  │ B    │ L1       │ 10  │ 2025-02-01 │                                │
//! │  └──────┴──────────┴─────┴────────────┘                                │
//! │                                                                         │
//! │  Same-day lots keep insertion (rowid) order.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarded Writes
//! Updates carry the quantity the caller read (`WHERE quantity = ?` for
//! planned deltas, `WHERE quantity >= ?` for deductions). Zero affected
//! rows means another operation got there first; the caller's transaction
//! is rolled back with [`DbError::Conflict`].

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::WriteStamp;
use stockroom_core::{AvailableLot, DeltaPlan, InventoryKey, InventoryRecord, SkuTotal};

const RECORD_COLUMNS: &str = "sku, lot, location, quantity, inbound_date, created_by, \
     created_at, last_updated_date, last_updated_by, id_stamp";

/// Repository for stock records.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    // =========================================================================
    // Connection-level (transactional) operations
    // =========================================================================

    /// Exact-key lookup on a given connection.
    pub async fn find(
        conn: &mut SqliteConnection,
        key: &InventoryKey,
    ) -> DbResult<Option<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM inventory WHERE sku = ?1 AND lot = ?2 AND location = ?3",
            RECORD_COLUMNS
        );
        let record = sqlx::query_as::<_, InventoryRecord>(&sql)
            .bind(&key.sku)
            .bind(&key.lot)
            .bind(&key.location)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(record)
    }

    /// Lots of `sku` with positive quantity, oldest first.
    pub async fn available_lots(
        conn: &mut SqliteConnection,
        sku: &str,
    ) -> DbResult<Vec<AvailableLot>> {
        let lots = sqlx::query_as::<_, AvailableLot>(
            r#"
            SELECT lot, location, quantity, inbound_date
            FROM inventory
            WHERE sku = ?1 AND quantity > 0
            ORDER BY inbound_date ASC, rowid ASC
            "#,
        )
        .bind(sku)
        .fetch_all(&mut *conn)
        .await?;

        debug!(sku = %sku, lots = lots.len(), "Listed available lots");
        Ok(lots)
    }

    /// First record of a SKU in natural row order, regardless of quantity.
    pub async fn first_for_sku(
        conn: &mut SqliteConnection,
        sku: &str,
    ) -> DbResult<Option<InventoryKey>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT sku, lot, location FROM inventory WHERE sku = ?1 ORDER BY rowid ASC LIMIT 1",
        )
        .bind(sku)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|(sku, lot, location)| InventoryKey { sku, lot, location }))
    }

    /// Executes a planned delta and returns the record as written.
    ///
    /// ## Plans
    /// - `Update` - guarded on the quantity the plan was computed from
    /// - `Insert` - new record; a concurrent insert surfaces as `UniqueViolation`
    pub async fn apply(
        conn: &mut SqliteConnection,
        key: &InventoryKey,
        plan: DeltaPlan,
        stamp: WriteStamp<'_>,
    ) -> DbResult<InventoryRecord> {
        debug!(key = %key, plan = ?plan, id_stamp = %stamp.id_stamp, "Applying ledger delta");

        match plan {
            DeltaPlan::Update {
                previous,
                new_quantity,
            } => {
                let result = sqlx::query(
                    r#"
                    UPDATE inventory
                    SET quantity = ?4,
                        last_updated_date = ?5,
                        last_updated_by = ?6,
                        id_stamp = ?7
                    WHERE sku = ?1 AND lot = ?2 AND location = ?3 AND quantity = ?8
                    "#,
                )
                .bind(&key.sku)
                .bind(&key.lot)
                .bind(&key.location)
                .bind(new_quantity)
                .bind(stamp.at)
                .bind(stamp.actor_id)
                .bind(stamp.id_stamp)
                .bind(previous)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::conflict("inventory", key.to_string()));
                }
            }
            DeltaPlan::Insert {
                quantity,
                inbound_date,
            } => {
                sqlx::query(
                    r#"
                    INSERT INTO inventory (
                        sku, lot, location, quantity, inbound_date,
                        created_by, created_at, last_updated_date, last_updated_by, id_stamp
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?6, ?8)
                    "#,
                )
                .bind(&key.sku)
                .bind(&key.lot)
                .bind(&key.location)
                .bind(quantity)
                .bind(inbound_date)
                .bind(stamp.actor_id)
                .bind(stamp.at)
                .bind(stamp.id_stamp)
                .execute(&mut *conn)
                .await?;
            }
        }

        Self::find(conn, key)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory", key.to_string()))
    }

    /// Removes `quantity` from a record, failing with `Conflict` if the record
    /// no longer holds at least that much.
    pub async fn deduct(
        conn: &mut SqliteConnection,
        key: &InventoryKey,
        quantity: i64,
        stamp: WriteStamp<'_>,
    ) -> DbResult<()> {
        debug!(key = %key, quantity, id_stamp = %stamp.id_stamp, "Deducting stock");

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity - ?4,
                last_updated_date = ?5,
                last_updated_by = ?6,
                id_stamp = ?7
            WHERE sku = ?1 AND lot = ?2 AND location = ?3 AND quantity >= ?4
            "#,
        )
        .bind(&key.sku)
        .bind(&key.lot)
        .bind(&key.location)
        .bind(quantity)
        .bind(stamp.at)
        .bind(stamp.actor_id)
        .bind(stamp.id_stamp)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("inventory", key.to_string()));
        }

        Ok(())
    }

    // =========================================================================
    // Pool-level reads and reports
    // =========================================================================

    /// Gets a record by its exact key.
    pub async fn get(&self, key: &InventoryKey) -> DbResult<Option<InventoryRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, key).await
    }

    /// Lots of `sku` with positive quantity, oldest first.
    pub async fn list_available(&self, sku: &str) -> DbResult<Vec<AvailableLot>> {
        let mut conn = self.pool.acquire().await?;
        Self::available_lots(&mut conn, sku).await
    }

    /// All records of a SKU (optionally including empty ones), FIFO order.
    pub async fn list_by_sku(&self, sku: &str, include_zero: bool) -> DbResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM inventory WHERE sku = ?1 AND (?2 OR quantity > 0) \
             ORDER BY inbound_date ASC, rowid ASC",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, InventoryRecord>(&sql)
            .bind(sku)
            .bind(include_zero)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// All records at a location.
    pub async fn list_by_location(
        &self,
        location: &str,
        include_zero: bool,
    ) -> DbResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM inventory WHERE location = ?1 AND (?2 OR quantity > 0) \
             ORDER BY sku ASC, inbound_date ASC, rowid ASC",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, InventoryRecord>(&sql)
            .bind(location)
            .bind(include_zero)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Every record in the ledger, by SKU then FIFO order.
    pub async fn list_all(&self, include_zero: bool) -> DbResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM inventory WHERE (?1 OR quantity > 0) \
             ORDER BY sku ASC, inbound_date ASC, rowid ASC",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, InventoryRecord>(&sql)
            .bind(include_zero)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Records received on or before `date`, by SKU and lot.
    ///
    /// Quantities are current ones: the ledger keeps no per-day snapshots.
    pub async fn stock_on_date(&self, date: NaiveDate) -> DbResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM inventory WHERE inbound_date <= ?1 \
             ORDER BY sku ASC, lot ASC, location ASC",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, InventoryRecord>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Records of a SKU, most recently touched first.
    pub async fn history(&self, sku: &str) -> DbResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM inventory WHERE sku = ?1 \
             ORDER BY last_updated_date DESC, rowid DESC",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, InventoryRecord>(&sql)
            .bind(sku)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Substring search over sku, lot and location.
    ///
    /// `%` and `_` in the term match literally.
    pub async fn search(&self, term: &str, limit: u32) -> DbResult<Vec<InventoryRecord>> {
        let term = term.trim();
        debug!(term = %term, limit, "Searching inventory");

        let pattern = format!("%{}%", escape_like(term));
        let sql = format!(
            "SELECT {} FROM inventory \
             WHERE sku LIKE ?1 ESCAPE '\\' OR lot LIKE ?1 ESCAPE '\\' OR location LIKE ?1 ESCAPE '\\' \
             ORDER BY sku ASC, inbound_date ASC, rowid ASC \
             LIMIT ?2",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, InventoryRecord>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Total available quantity of a SKU across all lots.
    pub async fn total_available(&self, sku: &str) -> DbResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM inventory WHERE sku = ?1")
                .bind(sku)
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    /// SKUs whose total quantity is at or below `threshold`, lowest first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<SkuTotal>> {
        let rows = sqlx::query_as::<_, SkuTotal>(
            r#"
            SELECT sku, SUM(quantity) AS total
            FROM inventory
            GROUP BY sku
            HAVING SUM(quantity) <= ?1
            ORDER BY total ASC, sku ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts stock records (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{NaiveDate, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stamp() -> WriteStamp<'static> {
        WriteStamp {
            actor_id: "u1",
            id_stamp: "IN-TEST",
            at: Utc::now(),
        }
    }

    async fn receive(db: &Database, key: &InventoryKey, qty: i64, inbound: NaiveDate) {
        let mut tx = db.begin().await.unwrap();
        let current = InventoryRepository::find(&mut tx, key)
            .await
            .unwrap()
            .map(|r| r.quantity);
        let plan = stockroom_core::plan_delta(
            key,
            current,
            qty,
            stockroom_core::DeltaMode::Receive {
                inbound_date: inbound,
            },
        )
        .unwrap();
        InventoryRepository::apply(&mut tx, key, plan, stamp())
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_then_increment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let key = InventoryKey::new("SKU-1", "A", "L1");

        receive(&db, &key, 5, date(2025, 1, 1)).await;
        receive(&db, &key, 7, date(2025, 3, 1)).await;

        let record = db.inventory().get(&key).await.unwrap().unwrap();
        assert_eq!(record.quantity, 12);
        // inbound date is fixed at first receipt
        assert_eq!(record.inbound_date, date(2025, 1, 1));
        assert_eq!(record.last_updated_by, "u1");
        assert_eq!(record.id_stamp, "IN-TEST");
    }

    #[tokio::test]
    async fn test_available_lots_fifo_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        receive(&db, &InventoryKey::new("SKU-1", "B", "L1"), 10, date(2025, 2, 1)).await;
        receive(&db, &InventoryKey::new("SKU-1", "A", "L1"), 5, date(2025, 1, 1)).await;
        receive(&db, &InventoryKey::new("SKU-1", "C", "L2"), 1, date(2025, 2, 1)).await;
        receive(&db, &InventoryKey::new("SKU-2", "Z", "L1"), 9, date(2024, 1, 1)).await;

        let lots = db.inventory().list_available("SKU-1").await.unwrap();
        let names: Vec<&str> = lots.iter().map(|l| l.lot.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_deduct_guard() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let key = InventoryKey::new("SKU-1", "A", "L1");
        receive(&db, &key, 5, date(2025, 1, 1)).await;

        let mut tx = db.begin().await.unwrap();
        InventoryRepository::deduct(&mut tx, &key, 5, stamp())
            .await
            .unwrap();
        let err = InventoryRepository::deduct(&mut tx, &key, 1, stamp())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        tx.rollback().await.unwrap();

        // rolled back: still 5
        assert_eq!(db.inventory().total_available("SKU-1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let key = InventoryKey::new("SKU-1", "A", "L1");
        receive(&db, &key, 5, date(2025, 1, 1)).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let stale = DeltaPlan::Update {
            previous: 4,
            new_quantity: 6,
        };
        let err = InventoryRepository::apply(&mut conn, &key, stale, stamp())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_reports() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        receive(&db, &InventoryKey::new("SKU-1", "A", "L1"), 5, date(2025, 1, 1)).await;
        receive(&db, &InventoryKey::new("SKU-1", "B", "L2"), 10, date(2025, 2, 1)).await;
        receive(&db, &InventoryKey::new("SKU-2", "A", "L1"), 3, date(2025, 1, 1)).await;
        receive(&db, &InventoryKey::new("PART_X", "A", "L3"), 50, date(2025, 1, 1)).await;

        let repo = db.inventory();
        assert_eq!(repo.total_available("SKU-1").await.unwrap(), 15);
        assert_eq!(repo.total_available("NOPE").await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 4);

        let low = repo.low_stock(10).await.unwrap();
        assert_eq!(
            low,
            vec![SkuTotal {
                sku: "SKU-2".to_string(),
                total: 3
            }]
        );

        assert_eq!(repo.list_by_location("L1", false).await.unwrap().len(), 2);
        assert_eq!(repo.search("sku-", 20).await.unwrap().len(), 3);
        // underscore matches literally
        assert_eq!(repo.search("T_X", 20).await.unwrap().len(), 1);
        assert_eq!(repo.search("T%", 20).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_by_sku_include_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let key = InventoryKey::new("SKU-1", "A", "L1");
        receive(&db, &key, 2, date(2025, 1, 1)).await;

        let mut tx = db.begin().await.unwrap();
        InventoryRepository::deduct(&mut tx, &key, 2, stamp())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let repo = db.inventory();
        assert!(repo.list_by_sku("SKU-1", false).await.unwrap().is_empty());
        assert_eq!(repo.list_by_sku("SKU-1", true).await.unwrap().len(), 1);

        let first = {
            let mut conn = db.pool().acquire().await.unwrap();
            InventoryRepository::first_for_sku(&mut conn, "SKU-1")
                .await
                .unwrap()
        };
        assert_eq!(first, Some(key));
    }

    #[tokio::test]
    async fn test_all_stock_date_and_history_reports() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        receive(&db, &InventoryKey::new("SKU-2", "A", "L1"), 3, date(2025, 1, 1)).await;
        receive(&db, &InventoryKey::new("SKU-1", "B", "L2"), 10, date(2025, 2, 1)).await;
        receive(&db, &InventoryKey::new("SKU-1", "A", "L1"), 5, date(2025, 1, 1)).await;

        let repo = db.inventory();

        let all: Vec<(String, String)> = repo
            .list_all(true)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.sku, r.lot))
            .collect();
        assert_eq!(
            all,
            vec![
                ("SKU-1".to_string(), "A".to_string()),
                ("SKU-1".to_string(), "B".to_string()),
                ("SKU-2".to_string(), "A".to_string()),
            ]
        );

        let on_date = repo.stock_on_date(date(2025, 1, 15)).await.unwrap();
        assert_eq!(on_date.len(), 2);
        assert!(on_date.iter().all(|r| r.inbound_date <= date(2025, 1, 15)));
        assert_eq!(repo.stock_on_date(date(2025, 2, 1)).await.unwrap().len(), 3);
        assert!(repo.stock_on_date(date(2024, 12, 31)).await.unwrap().is_empty());

        // touch lot B last
        let key = InventoryKey::new("SKU-1", "B", "L2");
        let mut tx = db.begin().await.unwrap();
        let later = WriteStamp {
            actor_id: "u2",
            id_stamp: "OUT-TEST",
            at: Utc::now() + chrono::Duration::hours(1),
        };
        InventoryRepository::deduct(&mut tx, &key, 10, later)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let history = repo.history("SKU-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].lot, "B");
        assert_eq!(history[0].id_stamp, "OUT-TEST");
        assert_eq!(history[1].lot, "A");

        assert_eq!(repo.list_all(false).await.unwrap().len(), 2);
    }
}
