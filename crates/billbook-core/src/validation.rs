//! # Validation Module
//!
//! Input validation for Billbook operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP DTO (serde)                                             │
//! │  ├── Shape and type checks                                             │
//! │  └── Decimal → cents / bps conversion                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, ranges, id formats                               │
//! │  └── Runs before any mutation                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  ├── UNIQUE (bill_number)                                              │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::validation::{normalize_item_name, validate_quantity};
//!
//! assert_eq!(normalize_item_name("  Basmati Rice ").unwrap(), "basmati rice");
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Percentage;
use crate::{MAX_AMOUNT_CENTS, MAX_BILL_LINES, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// 100% in basis points.
const MAX_PERCENTAGE_BPS: u32 = 10_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates and trims a customer name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    required_text("customerName", name, 200)
}

/// Normalizes an item name to its stored form: trimmed and lowercased.
///
/// Item lookups by name go through this too, so `"Rice "` finds `"rice"`.
///
/// ## Example
/// ```rust
/// use billbook_core::validation::normalize_item_name;
///
/// assert_eq!(normalize_item_name("Sugar").unwrap(), "sugar");
/// assert!(normalize_item_name("   ").is_err());
/// ```
pub fn normalize_item_name(name: &str) -> ValidationResult<String> {
    required_text("itemName", name, 200).map(|n| n.to_lowercase())
}

/// Validates the free-text reason on a return request.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    required_text("reason", reason, 1000)
}

/// Trims and lowercases an optional email; empty becomes `None`.
pub fn normalize_email(email: Option<&str>) -> Option<String> {
    email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase)
}

/// Trims an optional free-text field; empty becomes `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (no filtering)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or return quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Create bill: line { item: "rice", quantity: 0 }                        │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(0) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → "quantity must be positive"                     │
/// │       ├── qty > 999? → "quantity must be between 1 and 999"            │
/// │       └── OK → ledger debit                                            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount that may be zero but never negative
/// (prices, amount paid, commission), and at most `MAX_AMOUNT_CENTS`.
///
/// ## Example
/// ```rust
/// use billbook_core::money::Money;
/// use billbook_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("amountPaid", Money::zero()).is_ok());
/// assert!(validate_non_negative("amountPaid", Money::from_cents(-1)).is_err());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() || amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

/// Validates a discount or tax rate: 0 to 100 percent.
pub fn validate_percentage(field: &str, rate: Percentage) -> ValidationResult<()> {
    if rate.bps() > MAX_PERCENTAGE_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

/// Validates a stock level on item create.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string and returns it in canonical lowercase form.
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("returnId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("returnId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<String> {
    uuid::Uuid::parse_str(id.trim())
        .map(|u| u.to_string())
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

/// Validates the number of lines on a bill or exchange: 1 to `MAX_BILL_LINES`.
pub fn validate_line_count<T>(field: &str, lines: &[T]) -> ValidationResult<()> {
    validate_not_empty(field, lines)?;
    if lines.len() > MAX_BILL_LINES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_BILL_LINES as i64,
        });
    }
    Ok(())
}

/// Validates that a list has at least one entry.
pub fn validate_not_empty<T>(field: &str, items: &[T]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
