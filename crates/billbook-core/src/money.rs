//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A bill with 10% discount and 5% tax computed in floats drifts by a    │
//! │  paisa here and there, and balance_due stops matching total - paid.    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                     │
//! │    Every stored amount is an i64 count of cents/paise.                 │
//! │    Decimals exist only at the HTTP boundary (rust_decimal).            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::money::Money;
//! use billbook_core::types::Percentage;
//!
//! let price = Money::from_cents(5000); // 50.00
//! let line = price.multiply_quantity(2); // 100.00
//! let tax = line.percentage_of(Percentage::from_bps(500));
//! assert_eq!(tax.cents(), 500);
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Where Money Flows
/// ```text
/// Item.sale_price ──► BillLine.sale_price × quantity ──► sub_total
///                                                           │
///           discount_amount ◄── percentage_of(discount) ◄───┤
///                                                           │
///   (sub_total - discount_amount) ──► percentage_of(tax) ──► tax_amount
///                                                           │
///                        total_amount ──► balance_due = total - amount_paid
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use billbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units (rupees, dollars).
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Converts a decimal amount (as received over HTTP) to cents.
    ///
    /// Rounds half away from zero at two decimal places, so `10.005`
    /// becomes `10.01`. Returns `None` when the value does not fit in i64.
    ///
    /// ```rust
    /// use billbook_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let amount = Money::from_decimal(Decimal::new(1099, 2)).unwrap();
    /// assert_eq!(amount.cents(), 1099);
    /// ```
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        i64::try_from(rounded.mantissa()).ok().map(Money)
    }

    /// Converts to a decimal with two fractional digits.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Fractional portion, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `self × rate`, rounded half-up to the nearest cent.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount * bps + 5000) / 10000`.
    ///
    /// ```rust
    /// use billbook_core::money::Money;
    /// use billbook_core::types::Percentage;
    ///
    /// let sub_total = Money::from_major(1000);
    /// let discount = sub_total.percentage_of(Percentage::from_bps(1000)); // 10%
    /// assert_eq!(discount, Money::from_major(100));
    /// ```
    pub fn percentage_of(&self, rate: Percentage) -> Money {
        let scaled = self.0 as i128 * rate.bps() as i128;
        let rounded = if scaled >= 0 {
            (scaled + 5000) / 10000
        } else {
            (scaled - 5000) / 10000
        };
        Money(rounded as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain `major.minor`, no currency symbol. Formatting with a symbol is a
/// presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_decimal_conversion() {
        assert_eq!(Money::from_decimal(dec!(945)), Some(Money::from_cents(94500)));
        assert_eq!(Money::from_decimal(dec!(10.5)), Some(Money::from_cents(1050)));
        assert_eq!(Money::from_decimal(dec!(10.005)), Some(Money::from_cents(1001)));
        assert_eq!(Money::from_decimal(dec!(-2.345)), Some(Money::from_cents(-235)));
        assert_eq!(Money::from_cents(94550).to_decimal(), dec!(945.50));
    }

    #[test]
    fn test_percentage_of() {
        let amount = Money::from_major(900);
        assert_eq!(amount.percentage_of(Percentage::from_bps(500)), Money::from_major(45));

        // 8.25% of 10.00 = 0.825 → 0.83
        let amount = Money::from_cents(1000);
        assert_eq!(amount.percentage_of(Percentage::from_bps(825)).cents(), 83);

        assert_eq!(amount.percentage_of(Percentage::zero()), Money::zero());
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }
}
