//! Return and refund DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bill::ReturnRecordResponse;
use super::decimal;
use billbook_core::{ReturnProduct, ReturnRequest, ReturnStatus};
use billbook_db::{BillRefund, RefundOutcome, ReturnRequestView};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnProductInput {
    pub item_id: Option<String>,
    #[serde(alias = "name")]
    pub item_name: Option<String>,
    #[serde(default)]
    pub quantity: i64,
}

impl From<ReturnProductInput> for ReturnProduct {
    /// The refund price is taken from the bill line, not the client.
    fn from(input: ReturnProductInput) -> Self {
        ReturnProduct {
            item_id: input.item_id,
            item_name: input.item_name.unwrap_or_default(),
            quantity: input.quantity,
            sale_price_cents: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReturnRequest {
    #[serde(default)]
    pub bill_id: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub products: Vec<ReturnProductInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnProductResponse {
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub sale_price: Decimal,
}

impl From<ReturnProduct> for ReturnProductResponse {
    fn from(product: ReturnProduct) -> Self {
        ReturnProductResponse {
            sale_price: decimal(product.sale_price_cents),
            item_id: product.item_id,
            item_name: product.item_name,
            quantity: product.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequestResponse {
    pub id: String,
    pub bill_id: String,
    pub bill_number: String,
    pub reason: String,
    pub products: Vec<ReturnProductResponse>,
    pub requested_by: String,
    pub status: ReturnStatus,
    pub refunded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReturnRequest> for ReturnRequestResponse {
    fn from(request: ReturnRequest) -> Self {
        ReturnRequestResponse {
            id: request.id,
            bill_id: request.bill_id,
            bill_number: request.bill_number,
            reason: request.reason,
            products: request.products.into_iter().map(Into::into).collect(),
            requested_by: request.requested_by,
            status: request.status,
            refunded: request.refunded,
            customer_name: None,
            requester_name: None,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

impl From<ReturnRequestView> for ReturnRequestResponse {
    fn from(view: ReturnRequestView) -> Self {
        ReturnRequestResponse {
            customer_name: view.customer_name,
            requester_name: view.requester_name,
            ..view.request.into()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub message: String,
    pub record: ReturnRecordResponse,
    pub already_allotted: bool,
    pub refund_amount: Decimal,
}

impl From<RefundOutcome> for RefundResponse {
    fn from(outcome: RefundOutcome) -> Self {
        let message = if outcome.already_allotted {
            "Refund already allotted"
        } else {
            "Refund allotted successfully"
        };
        RefundResponse {
            message: message.to_string(),
            record: outcome.record.into(),
            already_allotted: outcome.already_allotted,
            refund_amount: outcome.refund_amount.to_decimal(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRefundResponse {
    pub message: String,
    pub bill_id: String,
    pub allotted: u64,
    pub refund_amount: Decimal,
}

impl From<BillRefund> for BillRefundResponse {
    fn from(refund: BillRefund) -> Self {
        BillRefundResponse {
            message: format!("Refund allotted for {} returned item(s)", refund.allotted),
            bill_id: refund.bill_id,
            allotted: refund.allotted,
            refund_amount: refund.refund_amount.to_decimal(),
        }
    }
}
