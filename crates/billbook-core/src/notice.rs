//! Inbox message text for return and exchange events.

use crate::exchange::ExchangeLine;
use crate::money::Money;
use crate::types::{Bill, ReturnProduct};

fn product_lines(products: &[ReturnProduct], sep: &str) -> String {
    products
        .iter()
        .map(|p| {
            format!(
                "Item{sep}{}\nQty{sep}{}\nSale Price{sep}{}",
                p.item_name,
                p.quantity,
                Money::from_cents(p.sale_price_cents)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sent to every admin when a return request arrives.
pub fn return_requested(bill: &Bill, products: &[ReturnProduct]) -> String {
    format!(
        "Return request.\nBill No: {}\nCustomer Name: {}\n{}",
        bill.bill_number,
        bill.customer_name,
        product_lines(products, ": ")
    )
}

/// Sent to the requester once an admin approves.
pub fn return_approved(bill: &Bill, products: &[ReturnProduct]) -> String {
    format!(
        "Return request approved for\nBill No. :- {}\nCustomer Name :- {}\n{}\nPlease Provide Refund.",
        bill.bill_number,
        bill.customer_name,
        product_lines(products, " :- ")
    )
}

/// Sent to the requester once an admin rejects.
pub fn return_rejected(bill: &Bill, products: &[ReturnProduct]) -> String {
    format!(
        "Return request rejected for\nBill No. :- {}\nCustomer Name :- {}\n{}",
        bill.bill_number,
        bill.customer_name,
        product_lines(products, " :- ")
    )
}

/// Sent to the user who performed the exchange.
pub fn exchange_completed(original: &Bill, lines: &[ExchangeLine]) -> String {
    let body = lines
        .iter()
        .map(ExchangeLine::describe)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{}\nFor Bill: {}\nCustomer: {}",
        body, original.bill_number, original.customer_name
    )
}

/// Sent to every admin after an exchange.
pub fn exchange_completed_for_admin(
    original: &Bill,
    lines: &[ExchangeLine],
    actor_username: &str,
) -> String {
    format!(
        "Exchange by {}:\n{}",
        actor_username,
        exchange_completed(original, lines)
    )
}

/// In-app route for viewing an exchange bill.
pub fn exchange_link(new_bill_id: &str) -> String {
    format!("/exchanged-bill/{}", new_bill_id)
}
