//! Reservation lifecycle.
//!
//! ```text
//!              ┌──► PICKED      (ledger untouched)
//!   PENDING ───┼──► RETURNED    (caller-supplied quantity put back)
//!              └──► CANCELLED   (every allocation line put back)
//! ```
//!
//! Return is accepted from any status. Reserve carves stock out of the
//! ledger immediately, so available quantity excludes reserved stock.

use serde_json::json;
use sqlx::SqliteConnection;

use stockroom_core::reservation::{check_cancel, check_pick, check_return};
use stockroom_core::validation::{ensure_positive, validate_sku};
use stockroom_core::{CommandType, CoreError, IdStamp, InventoryKey, Reservation};
use stockroom_db::{DbError, ReservationRepository};

use super::{allocate_and_deduct, commit_error, details_of, receive_into, stamp, today, Engine};
use crate::context::OperationContext;
use crate::error::EngineResult;
use crate::outcome::{ReservationCancel, ReservationReturn};
use crate::requests::{parse_reserve_id, PickRequest, ReturnRequest};

impl Engine {
    // =========================================================================
    // Reserve
    // =========================================================================

    /// Holds `quantity` of `sku`, drawn oldest lots first.
    ///
    /// Allocation, deductions and the reservation row commit together.
    /// `InsufficientStock` leaves the ledger untouched.
    pub async fn reserve(
        &self,
        ctx: &OperationContext,
        sku: &str,
        quantity: i64,
    ) -> EngineResult<Reservation> {
        let mut op = self
            .audit
            .open(ctx, CommandType::Reserve, json!({ "sku": sku, "quantity": quantity }))
            .await;

        let result = self.reserve_in_tx(ctx, op.id_stamp(), sku, quantity).await;
        if let Ok(reservation) = &result {
            op.note("reserve_id", reservation.reserve_id.as_str());
        }
        self.finish(op, &result, |r| {
            format!(
                "reserved {} of {} as {} ({} line(s))",
                r.quantity,
                r.sku,
                r.reserve_id,
                r.lines.len()
            )
        })
        .await;
        result
    }

    async fn reserve_in_tx(
        &self,
        ctx: &OperationContext,
        id_stamp: &str,
        sku: &str,
        quantity: i64,
    ) -> EngineResult<Reservation> {
        validate_sku(sku)?;
        ensure_positive(quantity)?;

        let stamp = stamp(ctx, id_stamp);
        let mut tx = self.db.begin().await?;
        let allocation = allocate_and_deduct(&mut tx, sku, quantity, stamp).await?;

        let reservation = Reservation::pending(
            IdStamp::reservation().into_inner(),
            &allocation,
            &ctx.actor,
            stamp.at,
            id_stamp,
        )?;
        ReservationRepository::insert(&mut tx, &reservation).await?;
        tx.commit().await.map_err(commit_error)?;

        Ok(reservation)
    }

    // =========================================================================
    // Pick
    // =========================================================================

    /// Marks a PENDING reservation picked. The ledger is not touched: the
    /// stock left it when the reservation was made.
    pub async fn pick(
        &self,
        ctx: &OperationContext,
        request: &PickRequest,
    ) -> EngineResult<Reservation> {
        let op = self
            .audit
            .open(ctx, CommandType::Pick, details_of(request))
            .await;

        let result = self.pick_in_tx(ctx, op.id_stamp(), request).await;
        self.finish(op, &result, |r| {
            format!("picked {} of {} from {}", request.quantity, r.sku, r.reserve_id)
        })
        .await;
        result
    }

    async fn pick_in_tx(
        &self,
        ctx: &OperationContext,
        id_stamp: &str,
        request: &PickRequest,
    ) -> EngineResult<Reservation> {
        request.validate()?;

        let mut tx = self.db.begin().await?;
        let existing = ReservationRepository::find(&mut tx, &request.reserve_id).await?;
        check_pick(existing.as_ref(), &request.target(), request.quantity)?;

        ReservationRepository::mark_picked(
            &mut tx,
            &request.reserve_id,
            request.quantity,
            stamp(ctx, id_stamp),
        )
        .await?;
        let picked = reload(&mut tx, &request.reserve_id).await?;
        tx.commit().await.map_err(commit_error)?;

        Ok(picked)
    }

    // =========================================================================
    // Return
    // =========================================================================

    /// Puts `request.quantity` back at the request's lot/location and marks
    /// the reservation RETURNED, whatever its status.
    ///
    /// The quantity is taken as given; it is not compared with the
    /// reserved quantity.
    pub async fn return_reservation(
        &self,
        ctx: &OperationContext,
        request: &ReturnRequest,
    ) -> EngineResult<ReservationReturn> {
        let op = self
            .audit
            .open(ctx, CommandType::ReturnReservation, details_of(request))
            .await;

        let result = self.return_in_tx(ctx, op.id_stamp(), request).await;
        self.finish(op, &result, |r| {
            format!(
                "returned {} of {} from {} to {}",
                request.quantity,
                r.reservation.sku,
                r.reservation.reserve_id,
                r.record.key()
            )
        })
        .await;
        result
    }

    async fn return_in_tx(
        &self,
        ctx: &OperationContext,
        id_stamp: &str,
        request: &ReturnRequest,
    ) -> EngineResult<ReservationReturn> {
        request.validate()?;

        let stamp = stamp(ctx, id_stamp);
        let mut tx = self.db.begin().await?;
        let existing = ReservationRepository::find(&mut tx, &request.reserve_id).await?;
        check_return(existing.as_ref(), &request.target(), request.quantity)?;

        let record = receive_into(&mut tx, &request.key(), request.quantity, today(), stamp).await?;
        ReservationRepository::mark_returned(
            &mut tx,
            &request.reserve_id,
            request.quantity,
            &request.reason,
            stamp,
        )
        .await?;
        let reservation = reload(&mut tx, &request.reserve_id).await?;
        tx.commit().await.map_err(commit_error)?;

        Ok(ReservationReturn {
            reservation,
            record,
        })
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels a PENDING reservation, putting every allocation line back on
    /// the lot/location it came from.
    ///
    /// Anything other than PENDING is `ReservationNotFound`.
    pub async fn cancel_reservation(
        &self,
        ctx: &OperationContext,
        reserve_id: &str,
        reason: &str,
    ) -> EngineResult<ReservationCancel> {
        let mut op = self
            .audit
            .open(
                ctx,
                CommandType::CancelReservation,
                json!({ "reserve_id": reserve_id, "reason": reason }),
            )
            .await;

        let result = self.cancel_in_tx(ctx, op.id_stamp(), reserve_id, reason).await;
        if let Ok(cancel) = &result {
            op.note("sku", cancel.reservation.sku.as_str());
            op.note("quantity", cancel.reservation.quantity);
        }
        self.finish(op, &result, |c| {
            format!(
                "cancelled {} ({} of {} reinstated over {} line(s))",
                c.reservation.reserve_id,
                c.reservation.quantity,
                c.reservation.sku,
                c.reinstated.len()
            )
        })
        .await;
        result
    }

    async fn cancel_in_tx(
        &self,
        ctx: &OperationContext,
        id_stamp: &str,
        reserve_id: &str,
        reason: &str,
    ) -> EngineResult<ReservationCancel> {
        let reserve_id = parse_reserve_id(reserve_id)?;

        let stamp = stamp(ctx, id_stamp);
        let mut tx = self.db.begin().await?;
        let existing = ReservationRepository::find(&mut tx, &reserve_id).await?;
        check_cancel(existing.as_ref(), &reserve_id)?;
        let reservation =
            existing.ok_or_else(|| CoreError::reservation_not_found(reserve_id.as_str()))?;

        let today = today();
        let mut reinstated = Vec::new();
        for line in reservation.reinstatement_lines() {
            let key = InventoryKey::new(&reservation.sku, line.lot, line.location);
            reinstated.push(receive_into(&mut tx, &key, line.quantity, today, stamp).await?);
        }

        ReservationRepository::mark_cancelled(&mut tx, &reserve_id, reason, stamp).await?;
        let reservation = reload(&mut tx, &reserve_id).await?;
        tx.commit().await.map_err(commit_error)?;

        Ok(ReservationCancel {
            reservation,
            reinstated,
        })
    }

    // =========================================================================
    // Check
    // =========================================================================

    /// PENDING reservations, oldest first, optionally for one SKU.
    pub async fn list_pending(
        &self,
        ctx: &OperationContext,
        sku: Option<&str>,
    ) -> EngineResult<Vec<Reservation>> {
        let op = self
            .audit
            .open(ctx, CommandType::ReserveCheck, json!({ "sku": sku }))
            .await;

        let result: EngineResult<Vec<Reservation>> = self
            .db
            .reservations()
            .list_pending(sku)
            .await
            .map_err(Into::into);
        self.finish(op, &result, |list| {
            format!("{} pending reservation(s)", list.len())
        })
        .await;
        result
    }
}

async fn reload(conn: &mut SqliteConnection, reserve_id: &str) -> EngineResult<Reservation> {
    Ok(ReservationRepository::find(conn, reserve_id)
        .await?
        .ok_or_else(|| DbError::not_found("Reservation", reserve_id))?)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{audit_for, ctx, date, engine, quantity, seeded};
    use super::*;
    use crate::error::ErrorCode;
    use crate::requests::ReceiptLine;
    use stockroom_core::{AuditStatus, ReservationStatus};
    use stockroom_db::{Database, DbConfig};

    async fn total_available(engine: &Engine) -> i64 {
        engine.database().inventory().total_available("X").await.unwrap()
    }

    #[tokio::test]
    async fn test_reserve_carves_out_fifo() {
        let engine = seeded().await;

        let reservation = engine.reserve(&ctx(), "X", 8).await.unwrap();

        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert_eq!(reservation.quantity, 8);
        assert_eq!(reservation.reserved_lot, "A");
        assert_eq!(reservation.reserved_location, "L1");
        assert_eq!(reservation.lines.len(), 2);
        assert!(reservation.reserve_id.starts_with("RES-"));

        assert_eq!(quantity(&engine, "A", "L1").await, 0);
        assert_eq!(quantity(&engine, "B", "L2").await, 7);
        assert_eq!(engine.total_reserved("X").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_reserve_insufficient_leaves_ledger() {
        let engine = seeded().await;

        let err = engine.reserve(&ctx(), "X", 16).await.unwrap_err();
        assert_eq!(
            err.as_core(),
            Some(&CoreError::InsufficientStock {
                sku: "X".into(),
                requested: 16,
                available: 15,
                shortfall: 1,
            })
        );
        assert_eq!(total_available(&engine).await, 15);
        assert!(engine.list_pending(&ctx(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pick_and_over_pick() {
        let engine = seeded().await;
        let reservation = engine.reserve(&ctx(), "X", 8).await.unwrap();

        let over = engine
            .pick(
                &ctx(),
                &PickRequest::new(&reservation.reserve_id, "X", "A", "L1", 20),
            )
            .await
            .unwrap_err();
        assert_eq!(over.code(), ErrorCode::OverPick);

        let picked = engine
            .pick(
                &ctx(),
                &PickRequest::new(&reservation.reserve_id, "X", "A", "L1", 5),
            )
            .await
            .unwrap();
        assert_eq!(picked.status, ReservationStatus::Picked);
        assert_eq!(picked.picked_quantity, Some(5));
        assert_eq!(picked.picked_by.as_deref(), Some("u1"));

        // ledger untouched by the pick
        assert_eq!(total_available(&engine).await, 7);
    }

    #[tokio::test]
    async fn test_pick_accepts_any_allocation_line() {
        let engine = seeded().await;
        let reservation = engine.reserve(&ctx(), "X", 8).await.unwrap();

        let picked = engine
            .pick(
                &ctx(),
                &PickRequest::new(&reservation.reserve_id, "X", "B", "L2", 8),
            )
            .await
            .unwrap();
        assert_eq!(picked.status, ReservationStatus::Picked);

        let unknown_lot = engine
            .pick(
                &ctx(),
                &PickRequest::new(&reservation.reserve_id, "X", "Z", "L9", 1),
            )
            .await
            .unwrap_err();
        assert_eq!(unknown_lot.code(), ErrorCode::ReservationNotFound);
    }

    #[tokio::test]
    async fn test_reserve_then_cancel_restores_total() {
        let engine = seeded().await;
        let before = total_available(&engine).await;

        let reservation = engine.reserve(&ctx(), "X", 8).await.unwrap();
        assert_eq!(total_available(&engine).await, before - 8);

        let cancel = engine
            .cancel_reservation(&ctx(), &reservation.reserve_id, "customer changed mind")
            .await
            .unwrap();

        assert_eq!(cancel.reservation.status, ReservationStatus::Cancelled);
        assert_eq!(
            cancel.reservation.cancel_reason.as_deref(),
            Some("customer changed mind")
        );
        assert_eq!(cancel.reinstated.len(), 2);
        assert_eq!(total_available(&engine).await, before);
        assert_eq!(quantity(&engine, "A", "L1").await, 5);
        assert_eq!(quantity(&engine, "B", "L2").await, 10);
        assert_eq!(engine.total_reserved("X").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_only_from_pending() {
        let engine = seeded().await;
        let ctx = ctx();

        let picked = engine.reserve(&ctx, "X", 2).await.unwrap();
        engine
            .pick(&ctx, &PickRequest::new(&picked.reserve_id, "X", "A", "L1", 2))
            .await
            .unwrap();
        let err = engine
            .cancel_reservation(&ctx, &picked.reserve_id, "")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ReservationNotFound);

        let cancelled = engine.reserve(&ctx, "X", 2).await.unwrap();
        engine
            .cancel_reservation(&ctx, &cancelled.reserve_id, "")
            .await
            .unwrap();
        let again = engine
            .cancel_reservation(&ctx, &cancelled.reserve_id, "")
            .await
            .unwrap_err();
        assert_eq!(again.code(), ErrorCode::ReservationNotFound);

        let missing = engine
            .cancel_reservation(&ctx, "RES-NOPE", "")
            .await
            .unwrap_err();
        assert_eq!(missing.code(), ErrorCode::ReservationNotFound);
    }

    #[tokio::test]
    async fn test_return_reinstates_from_any_status() {
        let engine = seeded().await;
        let ctx = ctx();
        let reservation = engine.reserve(&ctx, "X", 8).await.unwrap();
        engine
            .pick(&ctx, &PickRequest::new(&reservation.reserve_id, "X", "A", "L1", 8))
            .await
            .unwrap();

        let returned = engine
            .return_reservation(
                &ctx,
                &ReturnRequest::new(&reservation.reserve_id, "X", "A", "L1", 3, "damaged"),
            )
            .await
            .unwrap();

        assert_eq!(returned.reservation.status, ReservationStatus::Returned);
        assert_eq!(returned.reservation.returned_quantity, Some(3));
        assert_eq!(returned.record.quantity, 3);
        assert_eq!(quantity(&engine, "A", "L1").await, 3);
    }

    #[tokio::test]
    async fn test_return_requires_matching_reservation() {
        let engine = seeded().await;
        let reservation = engine.reserve(&ctx(), "X", 3).await.unwrap();

        let err = engine
            .return_reservation(
                &ctx(),
                &ReturnRequest::new(&reservation.reserve_id, "OTHER", "A", "L1", 3, ""),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ReservationNotFound);
        assert_eq!(quantity(&engine, "A", "L1").await, 2);
    }

    #[tokio::test]
    async fn test_list_pending_is_audited() {
        let engine = seeded().await;
        let first = engine.reserve(&ctx(), "X", 1).await.unwrap();
        let second = engine.reserve(&ctx(), "X", 2).await.unwrap();

        let pending = engine.list_pending(&ctx(), Some("X")).await.unwrap();
        assert_eq!(
            pending.iter().map(|r| r.reserve_id.clone()).collect::<Vec<_>>(),
            vec![first.reserve_id, second.reserve_id]
        );
        assert!(engine.list_pending(&ctx(), Some("Y")).await.unwrap().is_empty());

        let checks = engine
            .audit_entries(&stockroom_core::AuditFilter {
                command_type: Some(CommandType::ReserveCheck),
                status: Some(AuditStatus::Success),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(checks.len(), 2);
    }

    #[tokio::test]
    async fn test_reserve_close_entry_carries_reserve_id() {
        let engine = seeded().await;
        let reservation = engine.reserve(&ctx(), "X", 4).await.unwrap();

        let entries = audit_for(&engine, &reservation.id_stamp).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].status, AuditStatus::Success);
        assert_eq!(
            entries[1].parsed_details.as_ref().unwrap()["reserve_id"],
            reservation.reserve_id.as_str()
        );
    }

    #[tokio::test]
    async fn test_failed_reserve_on_empty_ledger() {
        let engine = engine().await;
        let err = engine.reserve(&ctx(), "X", 1).await.unwrap_err();
        match err.as_core() {
            Some(CoreError::InsufficientStock { shortfall, .. }) => assert_eq!(*shortfall, 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reserve_rejects_invalid_sku() {
        let engine = seeded().await;

        let err = engine.reserve(&ctx(), "", 2).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = engine.reserve(&ctx(), "has space", 2).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(total_available(&engine).await, 15);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reserves_wait_for_each_other() {
        let path = std::env::temp_dir().join(format!("stockroom-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
            .await
            .unwrap();
        let engine = Engine::new(db);
        let receipt = ReceiptLine::new("X", 10, "A", "L1", date(2025, 1, 1));
        assert!(engine.inbound(&ctx(), &[receipt]).await.is_success());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.reserve(&ctx(), "X", 3).await })
            })
            .collect();

        let mut reserved = 0;
        let mut codes = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => reserved += 1,
                Err(e) => codes.push(e.code()),
            }
        }

        // writers queue on the lock: every 3 that fit is reserved, the rest are short
        assert_eq!(reserved, 3);
        assert!(
            codes.iter().all(|c| *c == ErrorCode::InsufficientStock),
            "unexpected codes: {:?}",
            codes
        );
        assert_eq!(total_available(&engine).await, 1);
        assert_eq!(engine.total_reserved("X").await.unwrap(), 9);

        engine.database().close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
