//! # Reservation Repository
//!
//! Reservations and their allocation lines.
//!
//! Status transitions are written with a status guard in the WHERE clause,
//! so two operations racing on the same PENDING reservation cannot both
//! move it.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::WriteStamp;
use stockroom_core::{Reservation, ReservationLine, SkuTotal};

const RESERVATION_COLUMNS: &str = "reserve_id, sku, quantity, reserved_by, reservation_date, \
     status, reserved_lot, reserved_location, id_stamp, \
     picked_by, picked_at, picked_quantity, \
     returned_by, returned_at, returned_quantity, return_reason, \
     cancelled_by, cancelled_at, cancel_reason";

/// Repository for reservations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    // =========================================================================
    // Connection-level (transactional) operations
    // =========================================================================

    /// Inserts a reservation together with its lines.
    pub async fn insert(conn: &mut SqliteConnection, reservation: &Reservation) -> DbResult<()> {
        debug!(
            reserve_id = %reservation.reserve_id,
            sku = %reservation.sku,
            quantity = reservation.quantity,
            lines = reservation.lines.len(),
            "Inserting reservation"
        );

        sqlx::query(
            r#"
            INSERT INTO reservations (
                reserve_id, sku, quantity, reserved_by, reservation_date,
                status, reserved_lot, reserved_location, id_stamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&reservation.reserve_id)
        .bind(&reservation.sku)
        .bind(reservation.quantity)
        .bind(&reservation.reserved_by)
        .bind(reservation.reservation_date)
        .bind(reservation.status)
        .bind(&reservation.reserved_lot)
        .bind(&reservation.reserved_location)
        .bind(&reservation.id_stamp)
        .execute(&mut *conn)
        .await?;

        for line in &reservation.lines {
            sqlx::query(
                r#"
                INSERT INTO reservation_lines (reserve_id, line_no, lot, location, quantity)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&reservation.reserve_id)
            .bind(line.line_no)
            .bind(&line.lot)
            .bind(&line.location)
            .bind(line.quantity)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Loads a reservation (with lines) on a given connection.
    pub async fn find(
        conn: &mut SqliteConnection,
        reserve_id: &str,
    ) -> DbResult<Option<Reservation>> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE reserve_id = ?1",
            RESERVATION_COLUMNS
        );
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(reserve_id)
            .fetch_optional(&mut *conn)
            .await?;

        match reservation {
            Some(mut reservation) => {
                reservation.lines = Self::lines(conn, reserve_id).await?;
                Ok(Some(reservation))
            }
            None => Ok(None),
        }
    }

    async fn lines(conn: &mut SqliteConnection, reserve_id: &str) -> DbResult<Vec<ReservationLine>> {
        let lines = sqlx::query_as::<_, ReservationLine>(
            r#"
            SELECT line_no, lot, location, quantity
            FROM reservation_lines
            WHERE reserve_id = ?1
            ORDER BY line_no ASC
            "#,
        )
        .bind(reserve_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(lines)
    }

    /// PENDING → PICKED.
    pub async fn mark_picked(
        conn: &mut SqliteConnection,
        reserve_id: &str,
        quantity: i64,
        stamp: WriteStamp<'_>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'PICKED', picked_by = ?2, picked_at = ?3, picked_quantity = ?4
            WHERE reserve_id = ?1 AND status = 'PENDING'
            "#,
        )
        .bind(reserve_id)
        .bind(stamp.actor_id)
        .bind(stamp.at)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("reservation", reserve_id));
        }
        Ok(())
    }

    /// Any status → RETURNED.
    pub async fn mark_returned(
        conn: &mut SqliteConnection,
        reserve_id: &str,
        quantity: i64,
        reason: &str,
        stamp: WriteStamp<'_>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'RETURNED', returned_by = ?2, returned_at = ?3,
                returned_quantity = ?4, return_reason = ?5
            WHERE reserve_id = ?1
            "#,
        )
        .bind(reserve_id)
        .bind(stamp.actor_id)
        .bind(stamp.at)
        .bind(quantity)
        .bind(reason)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Reservation", reserve_id));
        }
        Ok(())
    }

    /// PENDING → CANCELLED.
    pub async fn mark_cancelled(
        conn: &mut SqliteConnection,
        reserve_id: &str,
        reason: &str,
        stamp: WriteStamp<'_>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'CANCELLED', cancelled_by = ?2, cancelled_at = ?3, cancel_reason = ?4
            WHERE reserve_id = ?1 AND status = 'PENDING'
            "#,
        )
        .bind(reserve_id)
        .bind(stamp.actor_id)
        .bind(stamp.at)
        .bind(reason)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("reservation", reserve_id));
        }
        Ok(())
    }

    // =========================================================================
    // Pool-level reads
    // =========================================================================

    /// Gets a reservation by id.
    pub async fn get(&self, reserve_id: &str) -> DbResult<Option<Reservation>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, reserve_id).await
    }

    /// PENDING reservations, oldest first, optionally for one SKU.
    pub async fn list_pending(&self, sku: Option<&str>) -> DbResult<Vec<Reservation>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {} FROM reservations \
             WHERE status = 'PENDING' AND (?1 IS NULL OR sku = ?1) \
             ORDER BY reservation_date ASC, rowid ASC",
            RESERVATION_COLUMNS
        );
        let mut reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(sku)
            .fetch_all(&mut *conn)
            .await?;

        for reservation in &mut reservations {
            reservation.lines = Self::lines(&mut conn, &reservation.reserve_id).await?;
        }

        Ok(reservations)
    }

    /// Quantity currently held by PENDING reservations of a SKU.
    pub async fn total_reserved(&self, sku: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM reservations WHERE status = 'PENDING' AND sku = ?1",
        )
        .bind(sku)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Reserved totals per SKU across PENDING reservations.
    pub async fn pending_totals(&self) -> DbResult<Vec<SkuTotal>> {
        let rows = sqlx::query_as::<_, SkuTotal>(
            r#"
            SELECT sku, SUM(quantity) AS total
            FROM reservations
            WHERE status = 'PENDING'
            GROUP BY sku
            ORDER BY sku ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use stockroom_core::{Actor, Allocation, Deduction, ReservationStatus};

    fn reservation(id: &str, sku: &str) -> Reservation {
        let allocation = Allocation {
            sku: sku.to_string(),
            requested: 8,
            deductions: vec![
                Deduction {
                    lot: "A".to_string(),
                    location: "L1".to_string(),
                    quantity: 5,
                },
                Deduction {
                    lot: "B".to_string(),
                    location: "L2".to_string(),
                    quantity: 3,
                },
            ],
        };
        Reservation::pending(id, &allocation, &Actor::new("u1", "Ana"), Utc::now(), "RESV-1")
            .unwrap()
    }

    fn stamp() -> WriteStamp<'static> {
        WriteStamp {
            actor_id: "u2",
            id_stamp: "RESPK-1",
            at: Utc::now(),
        }
    }

    async fn insert(db: &Database, r: &Reservation) {
        let mut tx = db.begin().await.unwrap();
        ReservationRepository::insert(&mut tx, r).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_with_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &reservation("RES-1", "SKU-1")).await;

        let stored = db.reservations().get("RES-1").await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Pending);
        assert_eq!(stored.quantity, 8);
        assert_eq!(stored.lines.len(), 2);
        assert_eq!(stored.lines[1].lot, "B");

        assert!(db.reservations().get("RES-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pick_is_guarded_by_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &reservation("RES-1", "SKU-1")).await;

        let mut conn = db.pool().acquire().await.unwrap();
        ReservationRepository::mark_picked(&mut conn, "RES-1", 5, stamp())
            .await
            .unwrap();
        let err = ReservationRepository::mark_picked(&mut conn, "RES-1", 5, stamp())
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored = ReservationRepository::find(&mut conn, "RES-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ReservationStatus::Picked);
        assert_eq!(stored.picked_by.as_deref(), Some("u2"));
        assert_eq!(stored.picked_quantity, Some(5));
    }

    #[tokio::test]
    async fn test_pending_listing_and_totals() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &reservation("RES-1", "SKU-1")).await;
        insert(&db, &reservation("RES-2", "SKU-2")).await;
        insert(&db, &reservation("RES-3", "SKU-1")).await;

        {
            let mut conn = db.pool().acquire().await.unwrap();
            ReservationRepository::mark_cancelled(&mut conn, "RES-3", "typo", stamp())
                .await
                .unwrap();
        }

        let repo = db.reservations();
        assert_eq!(repo.list_pending(None).await.unwrap().len(), 2);
        let only_sku1 = repo.list_pending(Some("SKU-1")).await.unwrap();
        assert_eq!(only_sku1.len(), 1);
        assert_eq!(only_sku1[0].reserve_id, "RES-1");
        assert_eq!(only_sku1[0].lines.len(), 2);

        assert_eq!(repo.total_reserved("SKU-1").await.unwrap(), 8);
        assert_eq!(repo.pending_totals().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_return_from_any_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &reservation("RES-1", "SKU-1")).await;

        let mut conn = db.pool().acquire().await.unwrap();
        ReservationRepository::mark_cancelled(&mut conn, "RES-1", "x", stamp())
            .await
            .unwrap();
        ReservationRepository::mark_returned(&mut conn, "RES-1", 2, "damaged", stamp())
            .await
            .unwrap();

        let stored = ReservationRepository::find(&mut conn, "RES-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ReservationStatus::Returned);
        assert_eq!(stored.return_reason.as_deref(), Some("damaged"));
    }
}
