//! # billbook-core: Pure Business Logic for Billbook
//!
//! Everything Billbook decides about money, bills, returns and roles lives
//! here as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  apps/billbook-api (axum)                       │   │
//! │  │    bearer token ──► capability gate ──► DTO ──► workflow        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    billbook-db                                  │   │
//! │  │     ledger, repositories, transactional workflows               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ billbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ billing │ │ policy  │ │ report  │  │   │
//! │  │   │  Bill   │ │  Money  │ │ totals  │ │ window  │ │ summary │  │   │
//! │  │   │  Item   │ │ Percent │ │ numbers │ │ gate    │ │ top-N   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Bill, ReturnRecord, Role, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`billing`] - Totals, payment normalization, bill numbers
//! - [`access`] - Role → capability table
//! - [`policy`] - Return window and single-use gate
//! - [`exchange`] - Exchange line math
//! - [`report`] - Read-only aggregates over bills
//! - [`notice`] - Inbox message text
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use billbook_core::billing::{format_bill_number, BillTotals};
//! use billbook_core::{Money, Percentage};
//!
//! assert_eq!(format_bill_number(7), "BILL-0007");
//!
//! let totals = BillTotals::compute(
//!     Money::from_major(200),
//!     Percentage::zero(),
//!     Percentage::from_bps(500),
//!     Money::from_major(210),
//! );
//! assert!(totals.balance_due.is_zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod billing;
pub mod error;
pub mod exchange;
pub mod money;
pub mod notice;
pub mod policy;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::Capability;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use policy::ReturnPolicy;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of every regular bill number.
pub const BILL_NUMBER_PREFIX: &str = "BILL-";

/// Maximum quantity of a single item on a bill line.
///
/// Catches typos like 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest price, payment or commission accepted, in cents (10 billion).
///
/// With at most [`MAX_BILL_LINES`] lines of [`MAX_ITEM_QUANTITY`] each, bill
/// totals stay far inside i64.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Most lines on one bill or one exchange.
pub const MAX_BILL_LINES: usize = 200;

/// Page size for bill listings when the client does not send one.
pub const DEFAULT_PAGE_LIMIT: u32 = 5;

/// Bill-number suggestions returned per query.
pub const SUGGESTION_LIMIT: usize = 10;

/// Length of top-customer and top-staff lists.
pub const TOP_N: usize = 3;

/// Window for the weekly sales report.
pub const WEEKLY_WINDOW_DAYS: i64 = 7;

/// Days after the bill date during which returns and exchanges are accepted.
pub const DEFAULT_RETURN_WINDOW_DAYS: u32 = 7;
