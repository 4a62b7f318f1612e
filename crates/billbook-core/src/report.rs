//! # Report Reductions
//!
//! Read-only aggregates over bill headers. The db crate loads
//! [`BillFacts`] rows (scoped to a creator or not), these functions fold
//! them.
//!
//! ```text
//! ┌──────────────┐    ┌───────────────────┐    ┌───────────────────────┐
//! │ bills table  │───►│ Vec<BillFacts>    │───►│ summary, ratio,       │
//! │ (+ users)    │    │ (scope applied)   │    │ top-N, weekly, agents │
//! └──────────────┘    └───────────────────┘    └───────────────────────┘
//! ```
//!
//! Customer identity in reports is the trimmed, lowercased name.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentStatus, ReturnStatus};
use crate::WEEKLY_WINDOW_DAYS;

/// The slice of a bill that reports look at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillFacts {
    pub id: String,
    pub bill_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_status: PaymentStatus,
    pub total_amount_cents: i64,
    pub agent_name: Option<String>,
    pub commission_cents: i64,
    pub created_by: String,
    /// Username of the creator, when they are in the directory.
    pub creator_name: Option<String>,
    pub return_status: Option<ReturnStatus>,
    pub exchange_from: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BillFacts {
    fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    fn customer_key(&self) -> String {
        self.customer_name.trim().to_lowercase()
    }
}

// =============================================================================
// Output Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BillSummary {
    pub total_bills: usize,
    pub total_pending_bills: usize,
    pub total_sales: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusRatio {
    #[serde(rename = "Paid")]
    pub paid: usize,
    #[serde(rename = "Unpaid")]
    pub unpaid: usize,
    #[serde(rename = "Pending")]
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UniqueCustomers {
    pub count: usize,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerEntry {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bill_count: usize,
}

/// A name with its bill count, for top-N lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RankedEntry {
    pub name: String,
    pub bill_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WeeklySales {
    pub total_revenue: Money,
    pub bill_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AgentCommission {
    pub agent_name: String,
    pub total_commission: Money,
    pub bill_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleEntry {
    pub bill_number: String,
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesDetails {
    pub total_sales: Money,
    pub bills: Vec<SaleEntry>,
}

// =============================================================================
// Reductions
// =============================================================================

/// Bill count, outstanding count (Unpaid or Pending), and revenue.
pub fn summary(bills: &[BillFacts]) -> BillSummary {
    BillSummary {
        total_bills: bills.len(),
        total_pending_bills: bills
            .iter()
            .filter(|b| b.payment_status.is_outstanding())
            .count(),
        total_sales: bills.iter().map(BillFacts::total).sum(),
    }
}

pub fn status_ratio(bills: &[BillFacts]) -> StatusRatio {
    bills
        .iter()
        .fold(StatusRatio::default(), |mut ratio, bill| {
            match bill.payment_status {
                PaymentStatus::Paid => ratio.paid += 1,
                PaymentStatus::Unpaid => ratio.unpaid += 1,
                PaymentStatus::Pending => ratio.pending += 1,
            }
            ratio
        })
}

/// Distinct customers by normalized name, sorted.
pub fn unique_customers(bills: &[BillFacts]) -> UniqueCustomers {
    let mut names: Vec<String> = bills
        .iter()
        .map(BillFacts::customer_key)
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();

    UniqueCustomers {
        count: names.len(),
        names,
    }
}

/// One entry per customer with their latest contact details.
///
/// "Latest" is by bill creation time; blank details never overwrite known
/// ones.
pub fn customer_directory(bills: &[BillFacts]) -> Vec<CustomerEntry> {
    let mut ordered: Vec<&BillFacts> = bills.iter().collect();
    ordered.sort_by_key(|b| b.created_at);

    let mut directory: BTreeMap<String, CustomerEntry> = BTreeMap::new();
    for bill in ordered {
        let key = bill.customer_key();
        if key.is_empty() {
            continue;
        }
        let entry = directory.entry(key).or_insert_with(|| CustomerEntry {
            name: bill.customer_name.trim().to_string(),
            email: None,
            phone: None,
            bill_count: 0,
        });
        entry.bill_count += 1;
        entry.name = bill.customer_name.trim().to_string();
        if bill.customer_email.is_some() {
            entry.email = bill.customer_email.clone();
        }
        if bill.customer_phone.is_some() {
            entry.phone = bill.customer_phone.clone();
        }
    }

    directory.into_values().collect()
}

/// Top `n` customers by bill count; ties broken by name.
pub fn top_customers(bills: &[BillFacts], n: usize) -> Vec<RankedEntry> {
    rank(bills.iter().map(BillFacts::customer_key), n)
}

/// Top `n` bill creators by bill count; ties broken by name.
pub fn top_staff(bills: &[BillFacts], n: usize) -> Vec<RankedEntry> {
    rank(
        bills
            .iter()
            .map(|b| b.creator_name.clone().unwrap_or_else(|| b.created_by.clone())),
        n,
    )
}

fn rank(names: impl Iterator<Item = String>, n: usize) -> Vec<RankedEntry> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names.filter(|name| !name.is_empty()) {
        *counts.entry(name).or_default() += 1;
    }

    let mut ranked: Vec<RankedEntry> = counts
        .into_iter()
        .map(|(name, bill_count)| RankedEntry { name, bill_count })
        .collect();
    ranked.sort_by(|a, b| b.bill_count.cmp(&a.bill_count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(n);
    ranked
}

/// Revenue and count of bills created in the last seven days.
pub fn weekly_sales(bills: &[BillFacts], now: DateTime<Utc>) -> WeeklySales {
    let since = now - Duration::days(WEEKLY_WINDOW_DAYS);
    let recent: Vec<&BillFacts> = bills.iter().filter(|b| b.created_at >= since).collect();

    WeeklySales {
        total_revenue: recent.iter().map(|b| b.total()).sum(),
        bill_count: recent.len(),
    }
}

/// Commission owed per agent, sorted by agent name.
///
/// Bills without an agent or with zero commission are skipped.
pub fn agent_commissions(bills: &[BillFacts]) -> Vec<AgentCommission> {
    let mut per_agent: BTreeMap<String, AgentCommission> = BTreeMap::new();

    for bill in bills.iter().filter(|b| b.commission_cents > 0) {
        let Some(agent) = bill
            .agent_name
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        else {
            continue;
        };

        let entry = per_agent
            .entry(agent.to_string())
            .or_insert_with(|| AgentCommission {
                agent_name: agent.to_string(),
                total_commission: Money::zero(),
                bill_count: 0,
            });
        entry.total_commission += Money::from_cents(bill.commission_cents);
        entry.bill_count += 1;
    }

    per_agent.into_values().collect()
}

pub fn sales_details(bills: &[BillFacts]) -> SalesDetails {
    SalesDetails {
        total_sales: bills.iter().map(BillFacts::total).sum(),
        bills: bills
            .iter()
            .map(|b| SaleEntry {
                bill_number: b.bill_number.clone(),
                total_amount: b.total(),
            })
            .collect(),
    }
}

pub fn exchange_bill_count(bills: &[BillFacts]) -> usize {
    bills.iter().filter(|b| b.exchange_from.is_some()).count()
}

/// Bills that have a return request in any state.
pub fn return_bill_count(bills: &[BillFacts]) -> usize {
    bills.iter().filter(|b| b.return_status.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(number: &str, customer: &str, status: PaymentStatus, total: i64) -> BillFacts {
        BillFacts {
            id: number.to_lowercase(),
            bill_number: number.to_string(),
            customer_name: customer.to_string(),
            customer_email: None,
            customer_phone: None,
            payment_status: status,
            total_amount_cents: total,
            agent_name: None,
            commission_cents: 0,
            created_by: "u1".to_string(),
            creator_name: Some("editor".to_string()),
            return_status: None,
            exchange_from: None,
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<BillFacts> {
        vec![
            facts("BILL-0001", "Asha", PaymentStatus::Paid, 1000),
            facts("BILL-0002", " asha ", PaymentStatus::Unpaid, 2000),
            facts("BILL-0003", "Ravi", PaymentStatus::Pending, 500),
            facts("BILL-0004", "Meera", PaymentStatus::Paid, 700),
        ]
    }

    #[test]
    fn test_summary_and_ratio() {
        let bills = sample();
        let s = summary(&bills);
        assert_eq!(s.total_bills, 4);
        assert_eq!(s.total_pending_bills, 2);
        assert_eq!(s.total_sales, Money::from_cents(4200));

        let r = status_ratio(&bills);
        assert_eq!((r.paid, r.unpaid, r.pending), (2, 1, 1));
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({"Paid": 2, "Unpaid": 1, "Pending": 1})
        );
    }

    #[test]
    fn test_unique_customers_normalized() {
        let u = unique_customers(&sample());
        assert_eq!(u.count, 3);
        assert_eq!(u.names, vec!["asha", "meera", "ravi"]);
    }

    #[test]
    fn test_top_customers_ties_by_name() {
        let top = top_customers(&sample(), 2);
        assert_eq!(top[0], RankedEntry { name: "asha".to_string(), bill_count: 2 });
        assert_eq!(top[1].name, "meera");
    }

    #[test]
    fn test_weekly_sales_window() {
        let mut bills = sample();
        bills[0].created_at = Utc::now() - Duration::days(10);
        let w = weekly_sales(&bills, Utc::now());
        assert_eq!(w.bill_count, 3);
        assert_eq!(w.total_revenue, Money::from_cents(3200));
    }

    #[test]
    fn test_agent_commissions() {
        let mut bills = sample();
        bills[0].agent_name = Some("Kiran".to_string());
        bills[0].commission_cents = 100;
        bills[1].agent_name = Some("Kiran".to_string());
        bills[1].commission_cents = 250;
        bills[2].agent_name = Some("Dev".to_string());
        bills[2].commission_cents = 0;

        let agents = agent_commissions(&bills);
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].agent_name, "Kiran");
        assert_eq!(agents[0].total_commission, Money::from_cents(350));
        assert_eq!(agents[0].bill_count, 2);
    }

    #[test]
    fn test_customer_directory_keeps_latest_contact() {
        let mut bills = sample();
        bills[0].customer_email = Some("asha@old.example".to_string());
        bills[0].created_at = Utc::now() - Duration::days(2);
        bills[1].customer_email = Some("asha@new.example".to_string());

        let dir = customer_directory(&bills);
        let asha = dir.iter().find(|c| c.name.eq_ignore_ascii_case("asha")).unwrap();
        assert_eq!(asha.bill_count, 2);
        assert_eq!(asha.email.as_deref(), Some("asha@new.example"));
    }

    #[test]
    fn test_return_and_exchange_counts() {
        let mut bills = sample();
        bills[0].return_status = Some(ReturnStatus::Rejected);
        bills[3].exchange_from = Some("bill-0001".to_string());
        assert_eq!(return_bill_count(&bills), 1);
        assert_eq!(exchange_bill_count(&bills), 1);
    }
}
