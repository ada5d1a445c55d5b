//! # stockroom-engine: Warehouse Operations for Stockroom
//!
//! Inbound, outbound, adjustment and reservation operations over the
//! inventory ledger, each audited with one open and one close entry.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  Caller (already authorized)                                           │
//! │       │  OperationContext + typed request lines                         │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockroom-engine (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   Engine ──► stockroom-core (allocate, plan_delta, check_*)     │   │
//! │  │     │                                                           │   │
//! │  │     ├──► stockroom-db (transaction per operation / per item)    │   │
//! │  │     └──► AuditTrail (PROCESSING ─► SUCCESS | FAILED)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - The [`Engine`] and its operations
//! - [`requests`] - Typed request lines
//! - [`outcome`] - Operation results and reports
//! - [`audit`] - Open / close audit entries
//! - [`config`] - TOML + environment configuration
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - Engine errors and error codes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_engine::{init_tracing, Engine, EngineConfig, OperationContext, OutboundLine};
//! use stockroom_core::Actor;
//!
//! let config = EngineConfig::load(None)?;
//! init_tracing(&config.logging);
//!
//! let engine = Engine::connect(&config).await?;
//! let ctx = OperationContext::new(Actor::new("u1", "Ana"), config.inventory.clone())
//!     .with_raw_command("/out SKU-1 8 order-77");
//!
//! let report = engine.outbound(&ctx, &[OutboundLine::new("SKU-1", 8, "order-77")]).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod requests;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditTrail, OpenOperation};
pub use config::{
    ConfigError, DatabaseSettings, EngineConfig, InventorySettings, LoggingSettings,
};
pub use context::OperationContext;
pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorCode, ErrorDetail};
pub use outcome::{
    BatchReport, ItemEffect, ItemOutcome, LowStockLine, ReservationCancel, ReservationReturn,
    StockSummary,
};
pub use requests::{AdjustmentLine, OutboundLine, PickRequest, ReceiptLine, ReturnRequest};
pub use telemetry::init_tracing;
