//! Bill DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{decimal, money, optional_money, optional_percent, rate};
use crate::error::ApiError;
use billbook_core::{
    Bill, BillLine, ExchangeRecord, PaymentMethod, PaymentStatus, ReturnRecord, ReturnStatus,
};
use billbook_db::{BillPage, BillPatch, LineRequest, NewBill};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillItemInput {
    pub item_id: Option<String>,
    #[serde(alias = "name")]
    pub item_name: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    /// Overrides the catalog price for this line.
    pub sale_price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    #[serde(default)]
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub items: Vec<BillItemInput>,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub amount_paid: Option<Decimal>,
    pub agent_name: Option<String>,
    pub commission: Option<Decimal>,
}

impl TryFrom<CreateBillRequest> for NewBill {
    type Error = ApiError;

    fn try_from(body: CreateBillRequest) -> Result<Self, Self::Error> {
        let lines = body
            .items
            .into_iter()
            .map(|item| {
                Ok(LineRequest {
                    item_id: item.item_id,
                    item_name: item.item_name,
                    quantity: item.quantity,
                    sale_price: optional_money("salePrice", item.sale_price)?,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(NewBill {
            customer_name: body.customer_name,
            customer_phone: body.customer_phone,
            customer_email: body.customer_email,
            payment_status: body.payment_status,
            payment_method: body.payment_method,
            lines,
            discount: optional_percent("discount", body.discount)?.unwrap_or_default(),
            tax: optional_percent("tax", body.tax)?.unwrap_or_default(),
            amount_paid: optional_money("amountPaid", body.amount_paid)?.unwrap_or_default(),
            agent_name: body.agent_name,
            commission: optional_money("commission", body.commission)?.unwrap_or_default(),
        })
    }
}

/// Partial update. `billNumber` and `billDate` are accepted only so they
/// can be refused.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillRequest {
    pub bill_number: Option<serde_json::Value>,
    pub bill_date: Option<serde_json::Value>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub amount_paid: Option<Decimal>,
    pub agent_name: Option<String>,
    pub commission: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
}

impl TryFrom<UpdateBillRequest> for BillPatch {
    type Error = ApiError;

    fn try_from(body: UpdateBillRequest) -> Result<Self, Self::Error> {
        Ok(BillPatch {
            bill_number: body.bill_number.map(|v| v.to_string()),
            bill_date: body.bill_date.map(|v| v.to_string()),
            customer_name: body.customer_name,
            customer_phone: body.customer_phone,
            customer_email: body.customer_email,
            payment_status: body.payment_status,
            payment_method: body.payment_method,
            amount_paid: optional_money("amountPaid", body.amount_paid)?,
            agent_name: body.agent_name,
            commission: optional_money("commission", body.commission)?,
            discount: optional_percent("discount", body.discount)?,
            tax: optional_percent("tax", body.tax)?,
        })
    }
}

/// `GET /bills` query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBillsQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Admins only: list every creator's bills instead of their own.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionQuery {
    pub q: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLineResponse {
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub line_total: Decimal,
}

impl From<BillLine> for BillLineResponse {
    fn from(line: BillLine) -> Self {
        BillLineResponse {
            line_total: line.line_total().to_decimal(),
            cost_price: decimal(line.cost_price_cents),
            sale_price: decimal(line.sale_price_cents),
            item_id: line.item_id,
            item_name: line.item_name,
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRecordResponse {
    pub id: String,
    pub bill_id: String,
    pub request_id: String,
    pub item_id: Option<String>,
    pub item_name: String,
    pub quantity: i64,
    pub sale_price: Decimal,
    pub status: ReturnStatus,
    pub refund_allotted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ReturnRecord> for ReturnRecordResponse {
    fn from(record: ReturnRecord) -> Self {
        ReturnRecordResponse {
            sale_price: decimal(record.sale_price_cents),
            id: record.id,
            bill_id: record.bill_id,
            request_id: record.request_id,
            item_id: record.item_id,
            item_name: record.item_name,
            quantity: record.quantity,
            status: record.status,
            refund_allotted: record.refund_allotted,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecordResponse {
    pub id: String,
    pub old_item: String,
    pub old_item_quantity: i64,
    pub old_item_price: Decimal,
    pub new_item: String,
    pub new_item_quantity: i64,
    pub new_item_price: Decimal,
    pub quantity: i64,
    pub reason: Option<String>,
    pub difference: Decimal,
    pub refunded: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ExchangeRecord> for ExchangeRecordResponse {
    fn from(record: ExchangeRecord) -> Self {
        ExchangeRecordResponse {
            old_item_price: decimal(record.old_item_price_cents),
            new_item_price: decimal(record.new_item_price_cents),
            difference: decimal(record.difference_cents),
            id: record.id,
            old_item: record.old_item,
            old_item_quantity: record.old_item_quantity,
            new_item: record.new_item,
            new_item_quantity: record.new_item_quantity,
            quantity: record.quantity,
            reason: record.reason,
            refunded: record.refunded,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillResponse {
    pub id: String,
    pub bill_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub bill_date: DateTime<Utc>,
    pub bill_time: String,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<BillLineResponse>,
    pub sub_total: Decimal,
    pub discount: Decimal,
    pub discount_amount: Decimal,
    pub tax: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub agent_name: Option<String>,
    pub commission: Decimal,
    pub created_by: String,
    pub return_status: Option<ReturnStatus>,
    pub refund_amount: Decimal,
    pub returns: Vec<ReturnRecordResponse>,
    pub exchanges: Vec<ExchangeRecordResponse>,
    pub exchange_from: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Bill> for BillResponse {
    fn from(bill: Bill) -> Self {
        BillResponse {
            sub_total: decimal(bill.sub_total_cents),
            discount: rate(bill.discount_bps),
            discount_amount: decimal(bill.discount_amount_cents),
            tax: rate(bill.tax_bps),
            tax_amount: decimal(bill.tax_amount_cents),
            total_amount: decimal(bill.total_amount_cents),
            amount_paid: decimal(bill.amount_paid_cents),
            balance_due: decimal(bill.balance_due_cents),
            commission: decimal(bill.commission_cents),
            refund_amount: decimal(bill.refund_amount_cents),
            id: bill.id,
            bill_number: bill.bill_number,
            customer_name: bill.customer_name,
            customer_phone: bill.customer_phone,
            customer_email: bill.customer_email,
            bill_date: bill.bill_date,
            bill_time: bill.bill_time,
            payment_status: bill.payment_status,
            payment_method: bill.payment_method,
            items: bill.lines.into_iter().map(Into::into).collect(),
            agent_name: bill.agent_name,
            created_by: bill.created_by,
            return_status: bill.return_status,
            returns: bill.returns.into_iter().map(Into::into).collect(),
            exchanges: bill.exchanges.into_iter().map(Into::into).collect(),
            exchange_from: bill.exchange_from,
            created_at: bill.created_at,
            updated_at: bill.updated_at,
        }
    }
}

pub fn bill_list(bills: Vec<Bill>) -> Vec<BillResponse> {
    bills.into_iter().map(Into::into).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPageResponse {
    pub bills: Vec<BillResponse>,
    pub total_pages: u32,
    pub current_page: u32,
    pub total_bills: i64,
}

impl From<BillPage> for BillPageResponse {
    fn from(page: BillPage) -> Self {
        BillPageResponse {
            bills: bill_list(page.bills),
            total_pages: page.total_pages,
            current_page: page.current_page,
            total_bills: page.total_bills,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextBillNumberResponse {
    pub bill_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentClearedResponse {
    pub message: String,
    pub bills_updated: u64,
}
