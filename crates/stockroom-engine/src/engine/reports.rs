//! Read-only lookups and reports. None of these write audit entries.

use chrono::{DateTime, NaiveDate, Utc};

use stockroom_core::validation::{ensure_positive, validate_sku};
use stockroom_core::{
    allocate, Allocation, AuditFilter, AuditLogEntry, AuditStatus, AvailableLot, InventoryKey,
    InventoryRecord, Reservation, SkuTotal, StockMovement,
};

use super::Engine;
use crate::config::InventorySettings;
use crate::error::EngineResult;
use crate::outcome::{LowStockLine, StockSummary};

/// Default row cap for [`Engine::search`].
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

impl Engine {
    // =========================================================================
    // Ledger
    // =========================================================================

    /// Exact-key lookup.
    pub async fn lookup(&self, key: &InventoryKey) -> EngineResult<Option<InventoryRecord>> {
        Ok(self.db.inventory().get(key).await?)
    }

    /// Lots with stock, oldest first.
    pub async fn list_available(&self, sku: &str) -> EngineResult<Vec<AvailableLot>> {
        Ok(self.db.inventory().list_available(sku).await?)
    }

    /// What an outbound of `quantity` would take right now. Nothing is
    /// deducted.
    pub async fn allocate(&self, sku: &str, quantity: i64) -> EngineResult<Allocation> {
        ensure_positive(quantity)?;
        let lots = self.db.inventory().list_available(sku).await?;
        Ok(allocate(sku, quantity, &lots)?)
    }

    /// Records of a SKU with available and reserved totals.
    pub async fn stock_summary(
        &self,
        sku: &str,
        include_zero: bool,
    ) -> EngineResult<StockSummary> {
        let inventory = self.db.inventory();
        let records = inventory.list_by_sku(sku, include_zero).await?;
        let available = inventory.total_available(sku).await?;
        let reserved = self.db.reservations().total_reserved(sku).await?;

        Ok(StockSummary {
            sku: sku.to_string(),
            records,
            available,
            reserved,
        })
    }

    /// The whole ledger, by SKU then FIFO order.
    pub async fn all_stock(&self, include_zero: bool) -> EngineResult<Vec<InventoryRecord>> {
        Ok(self.db.inventory().list_all(include_zero).await?)
    }

    /// Records received on or before `date`, at their current quantities.
    pub async fn stock_on_date(&self, date: NaiveDate) -> EngineResult<Vec<InventoryRecord>> {
        Ok(self.db.inventory().stock_on_date(date).await?)
    }

    /// Records of a SKU, most recently updated first, each carrying the id
    /// stamp of the operation that last touched it.
    pub async fn history(&self, sku: &str) -> EngineResult<Vec<InventoryRecord>> {
        validate_sku(sku)?;
        Ok(self.db.inventory().history(sku).await?)
    }

    /// Everything stored at one location.
    pub async fn stock_at_location(
        &self,
        location: &str,
        include_zero: bool,
    ) -> EngineResult<Vec<InventoryRecord>> {
        Ok(self
            .db
            .inventory()
            .list_by_location(location, include_zero)
            .await?)
    }

    /// Substring search over SKU, lot and location.
    pub async fn search(
        &self,
        term: &str,
        limit: Option<u32>,
    ) -> EngineResult<Vec<InventoryRecord>> {
        Ok(self
            .db
            .inventory()
            .search(term, limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
            .await?)
    }

    /// SKUs whose total available quantity is at or below the configured
    /// threshold, lowest first.
    pub async fn low_stock(
        &self,
        settings: &InventorySettings,
    ) -> EngineResult<Vec<LowStockLine>> {
        let threshold = settings.low_stock_threshold;
        let totals = self.db.inventory().low_stock(threshold).await?;

        Ok(totals
            .into_iter()
            .map(|t| LowStockLine::from_total(t, threshold))
            .collect())
    }

    // =========================================================================
    // Reservations
    // =========================================================================

    pub async fn get_reservation(&self, reserve_id: &str) -> EngineResult<Option<Reservation>> {
        Ok(self.db.reservations().get(reserve_id).await?)
    }

    /// Quantity held by PENDING reservations of a SKU.
    pub async fn total_reserved(&self, sku: &str) -> EngineResult<i64> {
        Ok(self.db.reservations().total_reserved(sku).await?)
    }

    /// PENDING totals per SKU.
    pub async fn pending_totals(&self) -> EngineResult<Vec<SkuTotal>> {
        Ok(self.db.reservations().pending_totals().await?)
    }

    // =========================================================================
    // Audit
    // =========================================================================

    pub async fn audit_entries(&self, filter: &AuditFilter) -> EngineResult<Vec<AuditLogEntry>> {
        Ok(self.db.audit_log().query(filter).await?)
    }

    /// Successful stock movements in `[since, until]`, in log order.
    pub async fn movement_report(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<StockMovement>> {
        let entries = self
            .audit_entries(&AuditFilter {
                status: Some(AuditStatus::Success),
                since,
                until,
                ..AuditFilter::default()
            })
            .await?;

        Ok(entries.iter().filter_map(StockMovement::from_entry).collect())
    }
}
