//! Inbound, return, adjustment, outbound and cancel-outbound.

use serde_json::json;

use stockroom_core::{
    plan_delta, Allocation, CommandType, DeltaMode, InventoryKey, InventoryRecord,
};
use stockroom_db::InventoryRepository;

use super::{
    allocate_and_deduct, commit_error, details_of, receive_into, stamp, today, Engine,
};
use crate::context::OperationContext;
use crate::error::EngineResult;
use crate::outcome::{BatchReport, ItemEffect};
use crate::requests::{AdjustmentLine, OutboundLine, ReceiptLine};

impl Engine {
    // =========================================================================
    // Inbound / Return
    // =========================================================================

    /// Receives stock. Each line is its own transaction.
    pub async fn inbound(&self, ctx: &OperationContext, lines: &[ReceiptLine]) -> BatchReport {
        self.receive_batch(ctx, CommandType::Inbound, lines).await
    }

    /// Puts customer returns back on the ledger. Same rules as inbound.
    pub async fn return_stock(&self, ctx: &OperationContext, lines: &[ReceiptLine]) -> BatchReport {
        self.receive_batch(ctx, CommandType::Return, lines).await
    }

    async fn receive_batch(
        &self,
        ctx: &OperationContext,
        command_type: CommandType,
        lines: &[ReceiptLine],
    ) -> BatchReport {
        let op = self
            .audit
            .open(ctx, command_type, json!({ "items": details_of(&lines) }))
            .await;

        let mut items = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let result = self
                .receive_line(ctx, op.id_stamp(), line)
                .await
                .map(ItemEffect::Stocked);
            items.push(Self::item_outcome(&op, index, &line.sku, result));
        }

        self.finish_batch(op, items).await
    }

    async fn receive_line(
        &self,
        ctx: &OperationContext,
        id_stamp: &str,
        line: &ReceiptLine,
    ) -> EngineResult<InventoryRecord> {
        line.validate()?;

        let mut tx = self.db.begin().await?;
        let record = receive_into(
            &mut tx,
            &line.key(),
            line.quantity,
            line.date,
            stamp(ctx, id_stamp),
        )
        .await?;
        tx.commit().await.map_err(commit_error)?;

        Ok(record)
    }

    // =========================================================================
    // Adjustment
    // =========================================================================

    /// Signed corrections of existing records.
    ///
    /// A line that would take a record below zero fails with
    /// `NegativeQuantity` and leaves it untouched; adjustments never create
    /// records (`RecordNotFound`).
    pub async fn adjust(&self, ctx: &OperationContext, lines: &[AdjustmentLine]) -> BatchReport {
        let op = self
            .audit
            .open(ctx, CommandType::Adjustment, json!({ "items": details_of(&lines) }))
            .await;

        let mut items = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let result = self
                .adjust_line(ctx, op.id_stamp(), line)
                .await
                .map(ItemEffect::Stocked);
            items.push(Self::item_outcome(&op, index, &line.sku, result));
        }

        self.finish_batch(op, items).await
    }

    async fn adjust_line(
        &self,
        ctx: &OperationContext,
        id_stamp: &str,
        line: &AdjustmentLine,
    ) -> EngineResult<InventoryRecord> {
        line.validate()?;
        let key = line.key();

        let mut tx = self.db.begin().await?;
        let current = InventoryRepository::find(&mut tx, &key)
            .await?
            .map(|r| r.quantity);
        let plan = plan_delta(&key, current, line.delta, DeltaMode::Adjustment)?;
        let record = InventoryRepository::apply(&mut tx, &key, plan, stamp(ctx, id_stamp)).await?;
        tx.commit().await.map_err(commit_error)?;

        Ok(record)
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Ships stock, oldest lots first.
    ///
    /// Each line is allocated and deducted in one transaction: a line either
    /// ships in full or leaves the ledger untouched.
    pub async fn outbound(&self, ctx: &OperationContext, lines: &[OutboundLine]) -> BatchReport {
        let op = self
            .audit
            .open(ctx, CommandType::Outbound, json!({ "items": details_of(&lines) }))
            .await;

        let mut items = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let result = self
                .ship_line(ctx, op.id_stamp(), line)
                .await
                .map(ItemEffect::Shipped);
            items.push(Self::item_outcome(&op, index, &line.sku, result));
        }

        self.finish_batch(op, items).await
    }

    async fn ship_line(
        &self,
        ctx: &OperationContext,
        id_stamp: &str,
        line: &OutboundLine,
    ) -> EngineResult<Allocation> {
        line.validate()?;

        let mut tx = self.db.begin().await?;
        let allocation =
            allocate_and_deduct(&mut tx, &line.sku, line.quantity, stamp(ctx, id_stamp)).await?;
        tx.commit().await.map_err(commit_error)?;

        Ok(allocation)
    }

    // =========================================================================
    // Cancel-outbound
    // =========================================================================

    /// Puts a cancelled shipment back on the ledger.
    ///
    /// The stock goes to the SKU's first record in natural row order. A SKU
    /// with no record at all gets the configured cancel lot/location, dated
    /// today. The lots the shipment was drawn from are not tracked.
    pub async fn cancel_outbound(
        &self,
        ctx: &OperationContext,
        line: &OutboundLine,
    ) -> EngineResult<InventoryRecord> {
        let op = self
            .audit
            .open(ctx, CommandType::CancelOutbound, details_of(line))
            .await;

        let result = self.cancel_outbound_line(ctx, op.id_stamp(), line).await;
        self.finish(op, &result, |record| {
            format!("reinstated {} of {} at {}", line.quantity, line.sku, record.key())
        })
        .await;
        result
    }

    async fn cancel_outbound_line(
        &self,
        ctx: &OperationContext,
        id_stamp: &str,
        line: &OutboundLine,
    ) -> EngineResult<InventoryRecord> {
        line.validate()?;

        let mut tx = self.db.begin().await?;
        let key = match InventoryRepository::first_for_sku(&mut tx, &line.sku).await? {
            Some(key) => key,
            None => InventoryKey::new(
                &line.sku,
                &ctx.settings.cancel_out_lot,
                &ctx.settings.cancel_out_location,
            ),
        };
        let record =
            receive_into(&mut tx, &key, line.quantity, today(), stamp(ctx, id_stamp)).await?;
        tx.commit().await.map_err(commit_error)?;

        Ok(record)
    }
}
