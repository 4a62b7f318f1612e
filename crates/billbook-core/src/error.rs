//! # Error Types
//!
//! Domain-specific error types for billbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  billbook-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations, not-found, conflicts │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  billbook-db errors                                                    │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── WorkflowError    - CoreError | DbError from a workflow            │
//! │                                                                         │
//! │  HTTP errors (in app)                                                  │
//! │  └── ApiError         - What clients see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → WorkflowError → ApiError → Client │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages carry the offending value (item name, bill number, counts) so a
//! client can correct the input without a second lookup.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Item cannot be resolved by id or by name.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// A debit would take stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Create bill (qty: 5)
    ///      │
    ///      ▼
    /// Conditional debit: stock=3
    ///      │
    ///      ▼
    /// InsufficientStock { item: "rice", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole bill rolled back, stock still 3
    /// ```
    #[error("Not enough stock for item: {item}. Available: {available}, Required: {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    #[error("Bill not found: {0}")]
    BillNotFound(String),

    #[error("Return request not found: {0}")]
    RequestNotFound(String),

    /// No return record carries this id.
    #[error("Return record not found: {0}")]
    RecordNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("Invalid payment status: {0}. Allowed: Paid, Unpaid, Pending")]
    InvalidPaymentStatus(String),

    /// A Paid bill needs a real tender.
    #[error("Invalid payment method for Paid: {0}. Allowed: Cash, Card, UPI")]
    InvalidPaymentMethod(String),

    #[error("No items selected for return")]
    EmptyProductList,

    /// Unique index on bill_number rejected the insert.
    #[error("Bill number {0} already exists")]
    DuplicateBillNumber(String),

    #[error("Item '{name}' from vendor '{vendor}' already exists")]
    DuplicateItem { name: String, vendor: String },

    /// Several vendors or owners stock an item under this name.
    #[error("Item name '{0}' matches more than one item; send its id")]
    AmbiguousItem(String),

    /// A bill already went through a return or exchange, or a request is
    /// no longer pending.
    #[error("{0} has already been processed")]
    AlreadyProcessed(String),

    #[error("Return/exchange window of {days} days has expired for bill {bill_number}")]
    ReturnWindowExpired { bill_number: String, days: u32 },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Nothing was eligible for the requested refund allotment.
    #[error("No eligible return found to allot refund: {0}")]
    NoEligibleRecord(String),

    #[error("Cannot modify {0}")]
    ImmutableField(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for an insufficient-stock conflict.
    pub fn insufficient_stock(item: impl Into<String>, available: i64, requested: i64) -> Self {
        CoreError::InsufficientStock {
            item: item.into(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
