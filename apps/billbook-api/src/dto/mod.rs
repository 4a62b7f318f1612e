//! Request and response bodies.
//!
//! Everything on the wire is camelCase. Amounts are decimal numbers
//! (`945.5`) and rates are percents (`10` for 10%); the domain keeps cents
//! and basis points, and the conversion happens here.

pub mod bill;
pub mod exchange;
pub mod item;
pub mod report;
pub mod returns;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use billbook_core::types::Percentage;
use billbook_core::{CoreError, Money, ValidationError, MAX_AMOUNT_CENTS};

/// Decimal amount from a request body, at most `MAX_AMOUNT_CENTS`.
///
/// Negative amounts pass through; the workflows reject them by field.
pub(crate) fn money(field: &str, amount: Decimal) -> Result<Money, ApiError> {
    match Money::from_decimal(amount) {
        Some(money) if money.cents() <= MAX_AMOUNT_CENTS => Ok(money),
        _ => Err(CoreError::from(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        })
        .into()),
    }
}

pub(crate) fn optional_money(field: &str, amount: Option<Decimal>) -> Result<Option<Money>, ApiError> {
    amount.map(|a| money(field, a)).transpose()
}

/// Percent (0-100) from a request body.
pub(crate) fn percent(field: &str, rate: Decimal) -> Result<Percentage, ApiError> {
    Percentage::from_decimal(rate).ok_or_else(|| {
        CoreError::from(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        })
        .into()
    })
}

pub(crate) fn optional_percent(
    field: &str,
    rate: Option<Decimal>,
) -> Result<Option<Percentage>, ApiError> {
    rate.map(|r| percent(field, r)).transpose()
}

#[inline]
pub(crate) fn decimal(cents: i64) -> Decimal {
    Money::from_cents(cents).to_decimal()
}

#[inline]
pub(crate) fn rate(bps: u32) -> Decimal {
    Percentage::from_bps(bps).to_decimal()
}

/// `?search=` on listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_conversion() {
        assert_eq!(money("amountPaid", dec!(945.5)).unwrap(), Money::from_cents(94_550));
        assert_eq!(decimal(94_550), dec!(945.50));
        assert!(money("salePrice", dec!(90000000000000000)).is_err());
        assert!(money("salePrice", dec!(10000000000.01)).is_err());
        assert!(money("salePrice", dec!(10000000000)).is_ok());
    }

    #[test]
    fn test_percent_conversion() {
        assert_eq!(percent("discount", dec!(10)).unwrap(), Percentage::from_bps(1000));
        assert!(percent("discount", dec!(-5)).is_err());
        assert_eq!(rate(825), dec!(8.25));
    }
}
