//! # Post-Sale Policy
//!
//! Rules that decide whether a bill may still be returned or exchanged.
//!
//! ## Single-Use Gate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  bill.return_status   exchange bill?   exchanged already?   verdict     │
//! │  ─────────────────    ──────────────   ──────────────────   ─────────── │
//! │  None / Rejected      no               no                   open        │
//! │  Pending / Approved   -                -                    processed   │
//! │  -                    yes              -                    processed   │
//! │  -                    -                yes                  processed   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A rejected return leaves the bill open so the customer can try again.
//!
//! ## Window
//! Returns and exchanges must happen within `window_days` of the bill date.
//! A window of 0 disables the check.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Bill, BillLine, ReturnProduct, ReturnStatus};
use crate::validation::validate_quantity;
use crate::DEFAULT_RETURN_WINDOW_DAYS;

/// Time limit on returns and exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPolicy {
    pub window_days: u32,
}

impl Default for ReturnPolicy {
    fn default() -> Self {
        ReturnPolicy {
            window_days: DEFAULT_RETURN_WINDOW_DAYS,
        }
    }
}

impl ReturnPolicy {
    pub const fn new(window_days: u32) -> Self {
        ReturnPolicy { window_days }
    }

    /// No time limit.
    pub const fn unlimited() -> Self {
        ReturnPolicy { window_days: 0 }
    }

    /// Fails with `ReturnWindowExpired` once `now` is past the window.
    pub fn check_window(&self, bill: &Bill, now: DateTime<Utc>) -> CoreResult<()> {
        if self.window_days == 0 {
            return Ok(());
        }

        let deadline = bill.bill_date + Duration::days(i64::from(self.window_days));
        if now > deadline {
            return Err(CoreError::ReturnWindowExpired {
                bill_number: bill.bill_number.clone(),
                days: self.window_days,
            });
        }
        Ok(())
    }

    /// Window plus single-use gate, the checks shared by returns and
    /// exchanges.
    pub fn ensure_open(
        &self,
        bill: &Bill,
        already_exchanged: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        ensure_single_use(bill, already_exchanged)?;
        self.check_window(bill, now)
    }
}

/// Fails with `AlreadyProcessed` when the bill went through a return or an
/// exchange already.
///
/// `already_exchanged` is whether some exchange bill points back at `bill`.
pub fn ensure_single_use(bill: &Bill, already_exchanged: bool) -> CoreResult<()> {
    let returned = matches!(
        bill.return_status,
        Some(ReturnStatus::Pending) | Some(ReturnStatus::Approved)
    );

    if returned || already_exchanged || bill.is_exchange_bill() {
        return Err(CoreError::AlreadyProcessed(format!(
            "Bill {}",
            bill.bill_number
        )));
    }
    Ok(())
}

/// Quantity of `line` not yet taken back by an approved return.
pub fn returnable_quantity(bill: &Bill, line: &BillLine) -> i64 {
    let returned: i64 = bill
        .returns
        .iter()
        .filter(|record| record.status == ReturnStatus::Approved)
        .filter(|record| line.refers_to(record.item_id.as_deref(), &record.item_name))
        .map(|record| record.quantity)
        .sum();
    (line.quantity - returned).max(0)
}

/// Checks that every returned product was on the bill and fills in the
/// billed sale price.
///
/// Quantities are summed per bill line, so listing the same item twice
/// cannot return more than was bought.
pub fn resolve_return_products(
    bill: &Bill,
    products: Vec<ReturnProduct>,
) -> CoreResult<Vec<ReturnProduct>> {
    if products.is_empty() {
        return Err(CoreError::EmptyProductList);
    }

    let mut requested = vec![0_i64; bill.lines.len()];
    let mut resolved = Vec::with_capacity(products.len());

    for product in products {
        validate_quantity(product.quantity)?;

        let index = bill
            .lines
            .iter()
            .position(|line| line.refers_to(product.item_id.as_deref(), &product.item_name))
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "products".to_string(),
                reason: format!(
                    "{} is not on bill {}",
                    product.item_name, bill.bill_number
                ),
            })?;
        let line = &bill.lines[index];

        requested[index] += product.quantity;
        let returnable = returnable_quantity(bill, line);
        if requested[index] > returnable {
            return Err(ValidationError::OutOfRange {
                field: format!("quantity of {}", line.item_name),
                min: 1,
                max: returnable,
            }
            .into());
        }

        resolved.push(ReturnProduct {
            item_id: line.item_id.clone().or(product.item_id),
            item_name: line.item_name.clone(),
            quantity: product.quantity,
            sale_price_cents: line.sale_price_cents,
        });
    }

    Ok(resolved)
}
