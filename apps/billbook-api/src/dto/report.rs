//! Report DTOs
//!
//! Only reports that carry money need their own shape; the rest are
//! serialized as the core types.

use rust_decimal::Decimal;
use serde::Serialize;

use billbook_core::report::{AgentCommission, BillSummary, SalesDetails, WeeklySales};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub total_bills: usize,
    pub total_pending_bills: usize,
    pub total_sales: Decimal,
}

impl From<BillSummary> for SummaryResponse {
    fn from(summary: BillSummary) -> Self {
        SummaryResponse {
            total_bills: summary.total_bills,
            total_pending_bills: summary.total_pending_bills,
            total_sales: summary.total_sales.to_decimal(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySalesResponse {
    pub total_revenue: Decimal,
    pub bill_count: usize,
}

impl From<WeeklySales> for WeeklySalesResponse {
    fn from(weekly: WeeklySales) -> Self {
        WeeklySalesResponse {
            total_revenue: weekly.total_revenue.to_decimal(),
            bill_count: weekly.bill_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCommissionResponse {
    pub agent_name: String,
    pub total_commission: Decimal,
    pub bill_count: usize,
}

impl From<AgentCommission> for AgentCommissionResponse {
    fn from(agent: AgentCommission) -> Self {
        AgentCommissionResponse {
            agent_name: agent.agent_name,
            total_commission: agent.total_commission.to_decimal(),
            bill_count: agent.bill_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEntryResponse {
    pub bill_number: String,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesDetailsResponse {
    pub total_sales: Decimal,
    pub bills: Vec<SaleEntryResponse>,
}

impl From<SalesDetails> for SalesDetailsResponse {
    fn from(details: SalesDetails) -> Self {
        SalesDetailsResponse {
            total_sales: details.total_sales.to_decimal(),
            bills: details
                .bills
                .into_iter()
                .map(|entry| SaleEntryResponse {
                    bill_number: entry.bill_number,
                    total_amount: entry.total_amount.to_decimal(),
                })
                .collect(),
        }
    }
}
