//! # Exchange Lines
//!
//! An exchange swaps items already sold on a bill for other catalog items.
//! Each swap is an [`ExchangeLine`]; the workflow in billbook-db resolves
//! both items, moves stock, and turns the lines into a new Paid bill.
//!
//! ```text
//!   original bill                         new bill  <orig>-EX<millis>
//!   ┌──────────────┐                      ┌──────────────────────────┐
//!   │ 1 × item A   │── old_qty × A ──►    │ q × item B @ B.sale      │
//!   │   @ 100      │   back to stock      │ discount 0, tax 0        │
//!   └──────────────┘                      │ amount_paid = total      │
//!                     q × B out of stock  │ exchange_from = original │
//!                                         └──────────────────────────┘
//!   difference = q × B.sale − old_qty × A.sale
//! ```

use crate::billing::BillTotals;
use crate::money::Money;
use crate::types::{BillLine, Percentage};

/// One resolved swap: both items looked up, prices taken from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeLine {
    pub old_item_id: String,
    pub old_item_name: String,
    pub old_quantity: i64,
    pub old_price: Money,
    pub new_item_id: String,
    pub new_item_name: String,
    pub new_quantity: i64,
    pub new_price: Money,
    pub new_cost_price: Money,
    pub reason: Option<String>,
}

impl ExchangeLine {
    /// What the customer owes (positive) or is owed (negative) for this swap.
    pub fn difference(&self) -> Money {
        self.new_price.multiply_quantity(self.new_quantity)
            - self.old_price.multiply_quantity(self.old_quantity)
    }

    /// The line this swap contributes to the new bill.
    pub fn new_bill_line(&self) -> BillLine {
        BillLine {
            item_id: Some(self.new_item_id.clone()),
            item_name: self.new_item_name.clone(),
            quantity: self.new_quantity,
            cost_price_cents: self.new_cost_price.cents(),
            sale_price_cents: self.new_price.cents(),
        }
    }

    /// `"1 × old @ ₹100.00 has been successfully exchanged with 1 × new @ ₹150.00"`
    pub fn describe(&self) -> String {
        format!(
            "{} × {} @ ₹{} has been successfully exchanged with {} × {} @ ₹{}",
            self.old_quantity,
            self.old_item_name,
            self.old_price,
            self.new_quantity,
            self.new_item_name,
            self.new_price
        )
    }
}

/// Totals for an exchange bill: no discount, no tax, paid in full.
pub fn exchange_totals(lines: &[ExchangeLine]) -> BillTotals {
    let sub_total: Money = lines
        .iter()
        .map(|line| line.new_price.multiply_quantity(line.new_quantity))
        .sum();
    BillTotals::compute(sub_total, Percentage::zero(), Percentage::zero(), sub_total)
}
