//! # billbook-db: Storage and Workflows for Billbook
//!
//! SQLite storage, the inventory ledger, and the transactional workflows
//! (billing, returns, refunds, exchanges) built on top of them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /bills)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  billbook-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Workflows   │───►│    Ledger     │    │  Migrations  │   │   │
//! │  │   │ BillingEngine │    │ debit/credit  │    │  (embedded)  │   │   │
//! │  │   │ ReturnWorkflow│    └───────┬───────┘    │ 0001_*.sql   │   │   │
//! │  │   │ ExchangeWkflw │            │            └──────────────┘   │   │
//! │  │   └───────┬───────┘    ┌───────▼───────┐                       │   │
//! │  │           └───────────►│ Repositories  │◄── Database (pool.rs) │   │
//! │  │                        │ bill, item,   │                       │   │
//! │  │                        │ returns, ...  │                       │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage and workflow error types
//! - [`repository`] - Table-level reads and writes
//! - [`ledger`] - Stock debits and credits
//! - [`workflow`] - Billing, returns, refunds, exchanges, catalog
//! - [`reports`] - Dashboard figures over bill headers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use billbook_db::{BillingEngine, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("billbook.db")).await?;
//! let engine = BillingEngine::new(db.clone());
//! let bill = engine.create_bill(&principal, request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod reports;
pub mod repository;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, WorkflowError, WorkflowResult};
pub use ledger::InventoryLedger;
pub use pool::{Database, DbConfig};
pub use reports::Reports;

// Repository re-exports for convenience
pub use repository::bill::{BillFilter, BillPage, BillRepository};
pub use repository::item::ItemRepository;
pub use repository::notification::{NewNotification, NotificationRepository};
pub use repository::returns::{ReturnRepository, ReturnRequestView};
pub use repository::user::UserRepository;

pub use workflow::billing::{BillPatch, BillingEngine, LineRequest, NewBill};
pub use workflow::catalog::{Catalog, NewItem};
pub use workflow::exchange::{ExchangeLineRequest, ExchangeRequest, ExchangeWorkflow};
pub use workflow::returns::{BillRefund, RefundOutcome, ReturnWorkflow};

// =============================================================================
// Test Support
// =============================================================================
