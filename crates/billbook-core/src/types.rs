//! # Domain Types
//!
//! Core domain types used throughout Billbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │      Bill       │   │  ReturnRequest  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name (lower)   │   │  bill_number    │   │  bill_id (FK)   │       │
//! │  │  stock ≥ 0      │   │  lines[]        │   │  products[]     │       │
//! │  │  sale_price     │   │  returns[]      │   │  status         │       │
//! │  └─────────────────┘   │  exchanges[]    │   └─────────────────┘       │
//! │                        │  exchange_from  │                              │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  ReturnRecord   │   │ ExchangeRecord  │   │  Notification   │       │
//! │  │  bill_id (FK)   │   │  bill_id (FK,   │   │  user_id        │       │
//! │  │  refund_allotted│   │   the NEW bill) │   │  kind, read     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4, immutable, used for relations
//! - Business id: `bill_number`, item `name`; human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points (1 bp = 0.01%).
///
/// Discount, tax and item commission rates are all carried this way.
/// 1000 bps = 10%, 10000 bps = 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Converts a plain percent value (`10` or `8.25`) to basis points.
    ///
    /// Returns `None` for negative values or ones that overflow u32.
    /// Range checks (0-100) live in [`crate::validation::validate_percentage`].
    pub fn from_decimal(percent: rust_decimal::Decimal) -> Option<Self> {
        let mut bps = (percent * rust_decimal::Decimal::ONE_HUNDRED).round_dp_with_strategy(
            0,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        );
        bps.rescale(0);
        u32::try_from(bps.mantissa()).ok().map(Percentage)
    }

    /// Returns the percent as a decimal (`1000` bps → `10.00`).
    #[inline]
    pub fn to_decimal(&self) -> rust_decimal::Decimal {
        rust_decimal::Decimal::new(self.0 as i64, 2)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

// =============================================================================
// Role
// =============================================================================

/// The closed set of roles a principal can carry.
///
/// What each role may do is decided in one place:
/// [`crate::access::Capability`] and [`Role::can`](crate::access).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum Role {
    Admin,
    Editor,
    Customer,
    Agent,
    Vendor,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Editor,
        Role::Customer,
        Role::Agent,
        Role::Vendor,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Editor => "Editor",
            Role::Customer => "Customer",
            Role::Agent => "Agent",
            Role::Vendor => "Vendor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: identity providers are not consistent about `admin`
/// versus `Admin`.
impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            })
    }
}

/// The authenticated caller of an operation.
///
/// Identity is issued elsewhere; this is what survives token verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub role: Role,
}

// =============================================================================
// Payment Status / Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Pending,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Paid,
        PaymentStatus::Unpaid,
        PaymentStatus::Pending,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Pending => "Pending",
        }
    }

    /// Unpaid and Pending both count as money still owed.
    pub const fn is_outstanding(&self) -> bool {
        !matches!(self, PaymentStatus::Paid)
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    #[serde(rename = "UPI")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "UPI"))]
    Upi,
    /// Only valid while the bill is not Paid.
    #[serde(rename = "N/A")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "N/A"))]
    NotApplicable,
}

impl PaymentMethod {
    /// Methods a Paid bill may carry.
    pub const TENDERS: [PaymentMethod; 3] =
        [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Upi];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::NotApplicable => "N/A",
        }
    }

    pub const fn is_tender(&self) -> bool {
        !matches!(self, PaymentMethod::NotApplicable)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Return Status
// =============================================================================

/// Review state shared by return requests, return records and the bill's
/// `return_status` gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReturnStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "Pending",
            ReturnStatus::Approved => "Approved",
            ReturnStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Item
// =============================================================================

/// A catalog item with its stock counter.
///
/// Stock changes only through the inventory ledger: debits on bill creation
/// and exchange, credits on approved returns and exchange.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Item {
    pub id: String,

    /// Trimmed and lowercased on write.
    pub name: String,

    pub cost_price_cents: i64,
    pub sale_price_cents: i64,

    /// Never negative (CHECK constraint + conditional debit).
    pub stock: i64,

    pub vendor_name: String,
    pub category: String,

    /// Agent commission rate in basis points.
    pub commission_bps: u32,

    pub owner_id: String,
    pub owner_role: Role,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    pub fn can_supply(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A line on a bill. Snapshot of the item at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BillLine {
    /// Catalog id when known. Older or imported lines may only carry a name.
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
}

impl BillLine {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// `quantity × sale_price`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.sale_price().multiply_quantity(self.quantity)
    }

    /// Matches by catalog id first, then by normalized name.
    pub fn refers_to(&self, item_id: Option<&str>, item_name: &str) -> bool {
        match (self.item_id.as_deref(), item_id) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => self.item_name.trim().eq_ignore_ascii_case(item_name.trim()),
        }
    }
}

/// An invoice with its computed totals and post-sale state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Bill {
    pub id: String,

    /// `BILL-0001`, or `<original>-EX<millis>` for exchange bills.
    pub bill_number: String,

    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,

    #[ts(as = "String")]
    pub bill_date: DateTime<Utc>,
    /// `HH:MM` at creation (or last update).
    pub bill_time: String,

    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,

    pub lines: Vec<BillLine>,

    pub sub_total_cents: i64,
    pub discount_bps: u32,
    pub discount_amount_cents: i64,
    pub tax_bps: u32,
    pub tax_amount_cents: i64,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_due_cents: i64,

    pub agent_name: Option<String>,
    pub commission_cents: i64,

    pub created_by: String,

    /// `None` until a return is requested.
    pub return_status: Option<ReturnStatus>,
    /// Sum of refund-allotted return records.
    pub refund_amount_cents: i64,

    pub returns: Vec<ReturnRecord>,
    pub exchanges: Vec<ExchangeRecord>,

    /// Set on bills produced by an exchange; points at the original.
    pub exchange_from: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn is_exchange_bill(&self) -> bool {
        self.exchange_from.is_some()
    }

    /// Checks the payment status / method pairing.
    pub fn payment_is_consistent(&self) -> bool {
        match self.payment_status {
            PaymentStatus::Paid => self.payment_method.is_tender(),
            _ => self.payment_method == PaymentMethod::NotApplicable,
        }
    }

    /// Finds the line a returned or exchanged item refers to.
    pub fn find_line(&self, item_id: Option<&str>, item_name: &str) -> Option<&BillLine> {
        self.lines
            .iter()
            .find(|line| line.refers_to(item_id, item_name))
    }
}

// =============================================================================
// Return Record
// =============================================================================

/// Approved, per-item outcome of a return. Owned by a bill.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnRecord {
    pub id: String,
    pub bill_id: String,
    pub request_id: String,
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub sale_price_cents: i64,
    pub status: ReturnStatus,
    /// false → true only, and only when Approved.
    pub refund_allotted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ReturnRecord {
    /// Money owed to the customer for this record.
    pub fn refund_value(&self) -> Money {
        Money::from_cents(self.sale_price_cents).multiply_quantity(self.quantity)
    }

    pub fn is_refund_eligible(&self) -> bool {
        self.status == ReturnStatus::Approved && !self.refund_allotted
    }
}

// =============================================================================
// Exchange Record
// =============================================================================

/// Per-item detail of an exchange, stored on the new bill.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExchangeRecord {
    pub id: String,
    pub bill_id: String,
    pub old_item: String,
    pub old_item_quantity: i64,
    pub old_item_price_cents: i64,
    pub new_item: String,
    pub new_item_quantity: i64,
    pub new_item_price_cents: i64,
    pub quantity: i64,
    pub reason: Option<String>,
    /// `new_qty × new_price − old_qty × old_price`, signed.
    pub difference_cents: i64,
    pub refunded: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Return Request
// =============================================================================

/// One product line of a return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnProduct {
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub sale_price_cents: i64,
}

/// A request to return items from a bill, awaiting admin review.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnRequest {
    pub id: String,
    pub bill_id: String,
    pub bill_number: String,
    pub reason: String,
    pub products: Vec<ReturnProduct>,
    pub requested_by: String,
    pub status: ReturnStatus,
    pub refunded: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ReturnRequest {
    pub fn is_pending(&self) -> bool {
        self.status == ReturnStatus::Pending
    }
}

// =============================================================================
// Users & Notifications
// =============================================================================

/// Directory entry for a known user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NotificationKind {
    ReturnRequest,
    Return,
    Exchange,
    System,
    Custom,
}

/// An in-app inbox entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
    #[ts(type = "unknown")]
    pub data: Option<serde_json::Value>,
    pub read: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Query Scope
// =============================================================================

/// Which bills a read covers: everything, or one creator's bills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillScope {
    All,
    CreatedBy(String),
}

impl BillScope {
    pub fn creator(&self) -> Option<&str> {
        match self {
            BillScope::All => None,
            BillScope::CreatedBy(id) => Some(id.as_str()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
