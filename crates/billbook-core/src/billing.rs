//! # Billing Math
//!
//! Pure functions behind bill creation, update and exchange: totals,
//! bill numbers and payment normalization.
//!
//! ## Totals Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► sub_total = Σ quantity × sale_price                          │
//! │                 │                                                       │
//! │                 ├──► discount_amount = sub_total × discount%            │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │        taxable = sub_total − discount_amount                            │
//! │                 │                                                       │
//! │                 ├──► tax_amount = taxable × tax%                        │
//! │                 ▼                                                       │
//! │        total = taxable + tax_amount                                     │
//! │        balance_due = total − amount_paid                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use billbook_core::billing::BillTotals;
//! use billbook_core::money::Money;
//! use billbook_core::types::Percentage;
//!
//! let totals = BillTotals::compute(
//!     Money::from_major(1000),
//!     Percentage::from_bps(1000), // 10%
//!     Percentage::from_bps(500),  // 5%
//!     Money::zero(),
//! );
//! assert_eq!(totals.discount_amount, Money::from_major(100));
//! assert_eq!(totals.tax_amount, Money::from_major(45));
//! assert_eq!(totals.total, Money::from_major(945));
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{BillLine, PaymentMethod, PaymentStatus, Percentage};
use crate::BILL_NUMBER_PREFIX;

// =============================================================================
// Totals
// =============================================================================

/// Every derived amount on a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BillTotals {
    pub sub_total: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub balance_due: Money,
}

impl BillTotals {
    /// Computes totals from a sub total.
    ///
    /// Tax applies to the discounted amount, not the sub total.
    pub fn compute(
        sub_total: Money,
        discount: Percentage,
        tax: Percentage,
        amount_paid: Money,
    ) -> Self {
        let discount_amount = sub_total.percentage_of(discount);
        let taxable = sub_total - discount_amount;
        let tax_amount = taxable.percentage_of(tax);
        let total = taxable + tax_amount;

        BillTotals {
            sub_total,
            discount_amount,
            tax_amount,
            total,
            amount_paid,
            balance_due: total - amount_paid,
        }
    }

    /// Computes totals straight from bill lines.
    pub fn from_lines(
        lines: &[BillLine],
        discount: Percentage,
        tax: Percentage,
        amount_paid: Money,
    ) -> Self {
        Self::compute(sub_total(lines), discount, tax, amount_paid)
    }
}

/// `Σ quantity × sale_price` over the lines.
pub fn sub_total(lines: &[BillLine]) -> Money {
    lines.iter().map(BillLine::line_total).sum()
}

// =============================================================================
// Payment Normalization
// =============================================================================

/// Uppercases the first character and lowercases the rest.
///
/// ```rust
/// use billbook_core::billing::capitalize_first;
///
/// assert_eq!(capitalize_first("pAID"), "Paid");
/// assert_eq!(capitalize_first(""), "");
/// ```
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Parses a payment status the way clients send it (`"paid"`, `"UNPAID"`).
///
/// Missing or blank input defaults to Unpaid.
pub fn parse_payment_status(raw: Option<&str>) -> CoreResult<PaymentStatus> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(PaymentStatus::Unpaid);
    }

    let normalized = capitalize_first(raw);
    PaymentStatus::ALL
        .into_iter()
        .find(|status| status.as_str() == normalized)
        .ok_or(CoreError::InvalidPaymentStatus(normalized))
}

/// Resolves the payment method for a status.
///
/// ## Rules
/// ```text
/// status ≠ Paid  ──► N/A, whatever was sent
/// status = Paid  ──► Cash | Card | UPI (case-insensitive)
///                    missing → Cash
///                    anything else → InvalidPaymentMethod
/// ```
pub fn resolve_payment_method(
    status: PaymentStatus,
    raw: Option<&str>,
) -> CoreResult<PaymentMethod> {
    if status != PaymentStatus::Paid {
        return Ok(PaymentMethod::NotApplicable);
    }

    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(PaymentMethod::Cash);
    }

    PaymentMethod::TENDERS
        .into_iter()
        .find(|method| method.as_str().eq_ignore_ascii_case(raw))
        .ok_or_else(|| CoreError::InvalidPaymentMethod(raw.to_string()))
}

/// Normalizes a status/method pair in one go.
pub fn normalize_payment(
    status: Option<&str>,
    method: Option<&str>,
) -> CoreResult<(PaymentStatus, PaymentMethod)> {
    let status = parse_payment_status(status)?;
    let method = resolve_payment_method(status, method)?;
    Ok((status, method))
}

// =============================================================================
// Bill Numbers
// =============================================================================

/// Formats a sequence value as a bill number.
///
/// ```rust
/// use billbook_core::billing::format_bill_number;
///
/// assert_eq!(format_bill_number(1), "BILL-0001");
/// assert_eq!(format_bill_number(12345), "BILL-12345");
/// ```
pub fn format_bill_number(sequence: i64) -> String {
    format!("{}{:04}", BILL_NUMBER_PREFIX, sequence)
}

/// Extracts the sequence value from a regular bill number.
///
/// Exchange bill numbers (`BILL-0007-EX…`) do not parse.
pub fn parse_bill_number(number: &str) -> Option<i64> {
    let digits = number.strip_prefix(BILL_NUMBER_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Number for the bill produced by an exchange.
///
/// ```rust
/// use billbook_core::billing::exchange_bill_number;
///
/// assert_eq!(exchange_bill_number("BILL-0007", 1700000000000), "BILL-0007-EX1700000000000");
/// ```
pub fn exchange_bill_number(original: &str, unix_millis: i64) -> String {
    format!("{}-EX{}", original, unix_millis)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_totals() {
        let totals = BillTotals::compute(
            Money::from_major(1000),
            Percentage::from_bps(1000),
            Percentage::from_bps(500),
            Money::from_major(500),
        );
        assert_eq!(totals.discount_amount, Money::from_major(100));
        assert_eq!(totals.tax_amount, Money::from_major(45));
        assert_eq!(totals.total, Money::from_major(945));
        assert_eq!(totals.balance_due, Money::from_major(445));
    }

    #[test]
    fn test_totals_from_lines() {
        let lines = vec![
            BillLine {
                item_id: Some("a".to_string()),
                item_name: "rice".to_string(),
                quantity: 2,
                cost_price_cents: 3000,
                sale_price_cents: 5000,
            },
            BillLine {
                item_id: Some("b".to_string()),
                item_name: "dal".to_string(),
                quantity: 1,
                cost_price_cents: 2000,
                sale_price_cents: 2550,
            },
        ];
        let totals =
            BillTotals::from_lines(&lines, Percentage::zero(), Percentage::zero(), Money::zero());
        assert_eq!(totals.sub_total, Money::from_cents(12550));
        assert_eq!(totals.total, Money::from_cents(12550));
        assert_eq!(totals.balance_due, Money::from_cents(12550));
    }

    #[test]
    fn test_payment_status_normalization() {
        assert_eq!(parse_payment_status(Some("paid")).unwrap(), PaymentStatus::Paid);
        assert_eq!(parse_payment_status(Some("PENDING")).unwrap(), PaymentStatus::Pending);
        assert_eq!(parse_payment_status(None).unwrap(), PaymentStatus::Unpaid);
        assert_eq!(parse_payment_status(Some(" ")).unwrap(), PaymentStatus::Unpaid);

        let err = parse_payment_status(Some("settled")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentStatus(s) if s == "Settled"));
    }

    #[test]
    fn test_payment_method_rules() {
        assert_eq!(
            resolve_payment_method(PaymentStatus::Unpaid, Some("Card")).unwrap(),
            PaymentMethod::NotApplicable
        );
        assert_eq!(
            resolve_payment_method(PaymentStatus::Paid, Some("upi")).unwrap(),
            PaymentMethod::Upi
        );
        assert_eq!(
            resolve_payment_method(PaymentStatus::Paid, None).unwrap(),
            PaymentMethod::Cash
        );
        assert!(matches!(
            resolve_payment_method(PaymentStatus::Paid, Some("Cheque")),
            Err(CoreError::InvalidPaymentMethod(_))
        ));
        assert!(matches!(
            resolve_payment_method(PaymentStatus::Paid, Some("N/A")),
            Err(CoreError::InvalidPaymentMethod(_))
        ));
    }

    #[test]
    fn test_bill_numbers() {
        assert_eq!(format_bill_number(42), "BILL-0042");
        assert_eq!(parse_bill_number("BILL-0042"), Some(42));
        assert_eq!(parse_bill_number("BILL-0042-EX123"), None);
        assert_eq!(parse_bill_number("INV-0042"), None);
        assert_eq!(parse_bill_number("BILL-"), None);
    }

    proptest! {
        #[test]
        fn prop_totals_formula_holds(
            sub in 0i64..10_000_000,
            discount in 0u32..=10_000,
            tax in 0u32..=10_000,
            paid in 0i64..10_000_000,
        ) {
            let t = BillTotals::compute(
                Money::from_cents(sub),
                Percentage::from_bps(discount),
                Percentage::from_bps(tax),
                Money::from_cents(paid),
            );
            prop_assert_eq!(t.total, t.sub_total - t.discount_amount + t.tax_amount);
            prop_assert_eq!(t.balance_due, t.total - t.amount_paid);
            prop_assert!(t.discount_amount <= t.sub_total);
            prop_assert!(!t.total.is_negative());
        }

        #[test]
        fn prop_bill_number_roundtrips_and_orders(a in 1i64..100_000, b in 1i64..100_000) {
            prop_assert_eq!(parse_bill_number(&format_bill_number(a)), Some(a));
            if a < b {
                prop_assert!(
                    parse_bill_number(&format_bill_number(a)) < parse_bill_number(&format_bill_number(b))
                );
            }
        }
    }
}
