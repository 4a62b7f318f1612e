//! # Reports
//!
//! Dashboard figures. Each method loads the bill headers in scope once and
//! hands them to the pure reductions in [`billbook_core::report`].
//!
//! ```text
//! BillScope ──► bills().facts(scope) ──► Vec<BillFacts> ──► report::summary(..)
//!                (one query, no lines)                     report::top_staff(..)
//!                                                          ...
//! ```

use chrono::Utc;

use crate::error::DbResult;
use crate::Database;
use billbook_core::report::{
    self, AgentCommission, BillFacts, BillSummary, CustomerEntry, RankedEntry, SalesDetails,
    StatusRatio, UniqueCustomers, WeeklySales,
};
use billbook_core::{BillScope, TOP_N};

#[derive(Debug, Clone)]
pub struct Reports {
    db: Database,
}

impl Reports {
    pub fn new(db: Database) -> Self {
        Reports { db }
    }

    async fn facts(&self, scope: &BillScope) -> DbResult<Vec<BillFacts>> {
        self.db.bills().facts(scope).await
    }

    pub async fn summary(&self, scope: &BillScope) -> DbResult<BillSummary> {
        Ok(report::summary(&self.facts(scope).await?))
    }

    pub async fn bill_count(&self, scope: &BillScope) -> DbResult<i64> {
        self.db.bills().count(scope).await
    }

    pub async fn status_ratio(&self, scope: &BillScope) -> DbResult<StatusRatio> {
        Ok(report::status_ratio(&self.facts(scope).await?))
    }

    pub async fn unique_customers(&self, scope: &BillScope) -> DbResult<UniqueCustomers> {
        Ok(report::unique_customers(&self.facts(scope).await?))
    }

    pub async fn customer_directory(&self, scope: &BillScope) -> DbResult<Vec<CustomerEntry>> {
        Ok(report::customer_directory(&self.facts(scope).await?))
    }

    pub async fn top_customers(&self, scope: &BillScope) -> DbResult<Vec<RankedEntry>> {
        Ok(report::top_customers(&self.facts(scope).await?, TOP_N))
    }

    /// Users who created the most bills.
    pub async fn top_staff(&self, scope: &BillScope) -> DbResult<Vec<RankedEntry>> {
        Ok(report::top_staff(&self.facts(scope).await?, TOP_N))
    }

    pub async fn weekly_sales(&self, scope: &BillScope) -> DbResult<WeeklySales> {
        Ok(report::weekly_sales(&self.facts(scope).await?, Utc::now()))
    }

    pub async fn agent_commissions(&self, scope: &BillScope) -> DbResult<Vec<AgentCommission>> {
        Ok(report::agent_commissions(&self.facts(scope).await?))
    }

    pub async fn sales_details(&self, scope: &BillScope) -> DbResult<SalesDetails> {
        Ok(report::sales_details(&self.facts(scope).await?))
    }

    pub async fn exchange_bill_count(&self, scope: &BillScope) -> DbResult<usize> {
        Ok(report::exchange_bill_count(&self.facts(scope).await?))
    }

    pub async fn return_bill_count(&self, scope: &BillScope) -> DbResult<usize> {
        Ok(report::return_bill_count(&self.facts(scope).await?))
    }
}
