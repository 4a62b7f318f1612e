//! # Bill Repository
//!
//! Database operations for bills, their lines, and the bill-number
//! sequence.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  bills ─────────┬──< bill_lines        (ordered by position)            │
//! │   │             ├──< return_records    (ReturnRepository)               │
//! │   │             └──< exchange_records  (only on exchange bills)         │
//! │   │                                                                     │
//! │   └── exchange_from ──► bills.id       (original of an exchange)        │
//! │                                                                         │
//! │  bill_sequence('bill') ── UPDATE … RETURNING value → BILL-0001, ...     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads assemble a full [`Bill`] (header + lines + returns + exchanges).
//! Report queries load [`BillFacts`] instead, which skips the children.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::returns::ReturnRepository;
use billbook_core::billing::format_bill_number;
use billbook_core::report::BillFacts;
use billbook_core::{
    Bill, BillLine, BillScope, ExchangeRecord, PaymentMethod, PaymentStatus, ReturnStatus,
};

/// `SELECT <every header column> FROM bills <tail>`.
macro_rules! bill_select {
    ($($tail:literal),*) => {
        concat!(
            "SELECT id, bill_number, customer_name, customer_phone, customer_email, ",
            "bill_date, bill_time, payment_status, payment_method, ",
            "sub_total_cents, discount_bps, discount_amount_cents, tax_bps, tax_amount_cents, ",
            "total_amount_cents, amount_paid_cents, balance_due_cents, ",
            "agent_name, commission_cents, created_by, return_status, refund_amount_cents, ",
            "exchange_from, created_at, updated_at FROM bills ",
            $($tail),*
        )
    };
}

/// Bill header as stored.
#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    id: String,
    bill_number: String,
    customer_name: String,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    bill_date: DateTime<Utc>,
    bill_time: String,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    sub_total_cents: i64,
    discount_bps: u32,
    discount_amount_cents: i64,
    tax_bps: u32,
    tax_amount_cents: i64,
    total_amount_cents: i64,
    amount_paid_cents: i64,
    balance_due_cents: i64,
    agent_name: Option<String>,
    commission_cents: i64,
    created_by: String,
    return_status: Option<ReturnStatus>,
    refund_amount_cents: i64,
    exchange_from: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BillRow {
    fn into_bill(self) -> Bill {
        Bill {
            id: self.id,
            bill_number: self.bill_number,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            customer_email: self.customer_email,
            bill_date: self.bill_date,
            bill_time: self.bill_time,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            lines: Vec::new(),
            sub_total_cents: self.sub_total_cents,
            discount_bps: self.discount_bps,
            discount_amount_cents: self.discount_amount_cents,
            tax_bps: self.tax_bps,
            tax_amount_cents: self.tax_amount_cents,
            total_amount_cents: self.total_amount_cents,
            amount_paid_cents: self.amount_paid_cents,
            balance_due_cents: self.balance_due_cents,
            agent_name: self.agent_name,
            commission_cents: self.commission_cents,
            created_by: self.created_by,
            return_status: self.return_status,
            refund_amount_cents: self.refund_amount_cents,
            returns: Vec::new(),
            exchanges: Vec::new(),
            exchange_from: self.exchange_from,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// =============================================================================
// Listing Types
// =============================================================================

/// Filter for paginated bill listings.
#[derive(Debug, Clone)]
pub struct BillFilter {
    pub scope: BillScope,
    /// Substring of bill number or customer name.
    pub search: Option<String>,
    pub status: Option<PaymentStatus>,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl BillFilter {
    pub fn new(scope: BillScope) -> Self {
        BillFilter {
            scope,
            search: None,
            status: None,
            page: 1,
            limit: billbook_core::DEFAULT_PAGE_LIMIT,
        }
    }

    fn pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()))
    }
}

/// One page of bills, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPage {
    pub bills: Vec<Bill>,
    pub total_pages: u32,
    pub current_page: u32,
    pub total_bills: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Single-bill reads
    // -------------------------------------------------------------------------

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, id).await
    }

    pub async fn get_by_number(&self, bill_number: &str) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, BillRow>(bill_select!("WHERE bill_number = ?1"))
            .bind(bill_number.trim())
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::assemble(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    /// Loads a full bill on the caller's connection.
    pub async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Bill>> {
        let row = sqlx::query_as::<_, BillRow>(bill_select!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::assemble(conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn assemble(conn: &mut SqliteConnection, row: BillRow) -> DbResult<Bill> {
        let mut bill = row.into_bill();

        bill.lines = sqlx::query_as::<_, BillLine>(
            r#"
            SELECT item_id, item_name, quantity, cost_price_cents, sale_price_cents
            FROM bill_lines
            WHERE bill_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&bill.id)
        .fetch_all(&mut *conn)
        .await?;

        bill.returns = ReturnRepository::fetch_records_for_bill(conn, &bill.id).await?;

        bill.exchanges = sqlx::query_as::<_, ExchangeRecord>(
            r#"
            SELECT id, bill_id, old_item, old_item_quantity, old_item_price_cents,
                   new_item, new_item_quantity, new_item_price_cents, quantity,
                   reason, difference_cents, refunded, created_at
            FROM exchange_records
            WHERE bill_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&bill.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(bill)
    }

    async fn assemble_all(conn: &mut SqliteConnection, rows: Vec<BillRow>) -> DbResult<Vec<Bill>> {
        let mut bills = Vec::with_capacity(rows.len());
        for row in rows {
            bills.push(Self::assemble(conn, row).await?);
        }
        Ok(bills)
    }

    /// Whether some exchange bill points back at `bill_id`.
    pub async fn has_exchange_child(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bills WHERE exchange_from = ?1)",
        )
        .bind(bill_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    // -------------------------------------------------------------------------
    // Bill number sequence
    // -------------------------------------------------------------------------

    /// Allocates the next bill sequence value.
    ///
    /// Single statement, so two concurrent transactions can never read the
    /// same value. Call it inside the transaction that inserts the bill: a
    /// rollback returns the number.
    pub async fn next_sequence(conn: &mut SqliteConnection) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            "UPDATE bill_sequence SET value = value + 1 WHERE name = 'bill' RETURNING value",
        )
        .fetch_one(&mut *conn)
        .await?;
        Ok(value)
    }

    pub async fn number_taken(conn: &mut SqliteConnection, bill_number: &str) -> DbResult<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bills WHERE bill_number = ?1)")
                .bind(bill_number)
                .fetch_one(&mut *conn)
                .await?;
        Ok(taken)
    }

    /// Preview of the number the next bill will get. Allocates nothing.
    pub async fn peek_next_number(&self) -> DbResult<String> {
        let value: i64 =
            sqlx::query_scalar("SELECT value FROM bill_sequence WHERE name = 'bill'")
                .fetch_one(&self.pool)
                .await?;
        Ok(format_bill_number(value + 1))
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Inserts a bill with its lines and exchange records.
    ///
    /// A taken bill number surfaces as a unique violation on `bills`.
    pub async fn insert(conn: &mut SqliteConnection, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, bill_number = %bill.bill_number, "Inserting bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, customer_name, customer_phone, customer_email,
                bill_date, bill_time, payment_status, payment_method,
                sub_total_cents, discount_bps, discount_amount_cents, tax_bps, tax_amount_cents,
                total_amount_cents, amount_paid_cents, balance_due_cents,
                agent_name, commission_cents, created_by, return_status, refund_amount_cents,
                exchange_from, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22,
                ?23, ?24, ?25
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.bill_number)
        .bind(&bill.customer_name)
        .bind(&bill.customer_phone)
        .bind(&bill.customer_email)
        .bind(bill.bill_date)
        .bind(&bill.bill_time)
        .bind(bill.payment_status)
        .bind(bill.payment_method)
        .bind(bill.sub_total_cents)
        .bind(bill.discount_bps)
        .bind(bill.discount_amount_cents)
        .bind(bill.tax_bps)
        .bind(bill.tax_amount_cents)
        .bind(bill.total_amount_cents)
        .bind(bill.amount_paid_cents)
        .bind(bill.balance_due_cents)
        .bind(&bill.agent_name)
        .bind(bill.commission_cents)
        .bind(&bill.created_by)
        .bind(bill.return_status)
        .bind(bill.refund_amount_cents)
        .bind(&bill.exchange_from)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *conn)
        .await?;

        for (position, line) in bill.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bill_lines (
                    id, bill_id, position, item_id, item_name,
                    quantity, cost_price_cents, sale_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&bill.id)
            .bind(position as i64)
            .bind(&line.item_id)
            .bind(&line.item_name)
            .bind(line.quantity)
            .bind(line.cost_price_cents)
            .bind(line.sale_price_cents)
            .execute(&mut *conn)
            .await?;
        }

        for (position, record) in bill.exchanges.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO exchange_records (
                    id, bill_id, position, old_item, old_item_quantity, old_item_price_cents,
                    new_item, new_item_quantity, new_item_price_cents, quantity,
                    reason, difference_cents, refunded, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )
            .bind(&record.id)
            .bind(&bill.id)
            .bind(position as i64)
            .bind(&record.old_item)
            .bind(record.old_item_quantity)
            .bind(record.old_item_price_cents)
            .bind(&record.new_item)
            .bind(record.new_item_quantity)
            .bind(record.new_item_price_cents)
            .bind(record.quantity)
            .bind(&record.reason)
            .bind(record.difference_cents)
            .bind(record.refunded)
            .bind(record.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Rewrites the mutable header fields (customer, payment, amounts,
    /// agent, bill_time). Number, date, lines and creator never change.
    pub async fn update_header(&self, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, "Updating bill header");

        let result = sqlx::query(
            r#"
            UPDATE bills SET
                customer_name = ?2,
                customer_phone = ?3,
                customer_email = ?4,
                bill_time = ?5,
                payment_status = ?6,
                payment_method = ?7,
                sub_total_cents = ?8,
                discount_bps = ?9,
                discount_amount_cents = ?10,
                tax_bps = ?11,
                tax_amount_cents = ?12,
                total_amount_cents = ?13,
                amount_paid_cents = ?14,
                balance_due_cents = ?15,
                agent_name = ?16,
                commission_cents = ?17,
                updated_at = ?18
            WHERE id = ?1
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.customer_name)
        .bind(&bill.customer_phone)
        .bind(&bill.customer_email)
        .bind(&bill.bill_time)
        .bind(bill.payment_status)
        .bind(bill.payment_method)
        .bind(bill.sub_total_cents)
        .bind(bill.discount_bps)
        .bind(bill.discount_amount_cents)
        .bind(bill.tax_bps)
        .bind(bill.tax_amount_cents)
        .bind(bill.total_amount_cents)
        .bind(bill.amount_paid_cents)
        .bind(bill.balance_due_cents)
        .bind(&bill.agent_name)
        .bind(bill.commission_cents)
        .bind(bill.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill", &bill.id));
        }
        Ok(())
    }

    pub async fn set_return_status(
        conn: &mut SqliteConnection,
        bill_id: &str,
        status: ReturnStatus,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE bills SET return_status = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(bill_id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill", bill_id));
        }
        Ok(())
    }

    /// Sets `refund_amount` to the value of the bill's refund-allotted
    /// return records.
    pub async fn recompute_refund_amount(
        conn: &mut SqliteConnection,
        bill_id: &str,
    ) -> DbResult<i64> {
        let amount: i64 = sqlx::query_scalar(
            r#"
            UPDATE bills SET
                refund_amount_cents = (
                    SELECT COALESCE(SUM(quantity * sale_price_cents), 0)
                    FROM return_records
                    WHERE bill_id = ?1 AND refund_allotted = 1
                ),
                updated_at = ?2
            WHERE id = ?1
            RETURNING refund_amount_cents
            "#,
        )
        .bind(bill_id)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Bill", bill_id))?;

        Ok(amount)
    }

    /// Deletes a bill. Its lines and records go with it; stock is untouched.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM bills WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill", id));
        }
        Ok(())
    }

    /// Clears agent name and commission on every bill of `agent_name`.
    ///
    /// Returns how many bills changed.
    pub async fn clear_agent(&self, agent_name: &str) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE bills SET agent_name = NULL, commission_cents = 0, updated_at = ?2
            WHERE agent_name = ?1
            "#,
        )
        .bind(agent_name.trim())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Listings
    // -------------------------------------------------------------------------

    /// One page of bills matching `filter`, newest first.
    pub async fn list(&self, filter: &BillFilter) -> DbResult<BillPage> {
        let limit = filter.limit.max(1);
        let page = filter.page.max(1);
        let pattern = filter.pattern();
        let creator = filter.scope.creator();

        debug!(?creator, ?pattern, page, limit, "Listing bills");

        let mut conn = self.pool.acquire().await?;

        let total_bills: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bills
            WHERE (?1 IS NULL OR created_by = ?1)
              AND (?2 IS NULL OR lower(bill_number) LIKE ?2 OR lower(customer_name) LIKE ?2)
              AND (?3 IS NULL OR payment_status = ?3)
            "#,
        )
        .bind(creator)
        .bind(&pattern)
        .bind(filter.status)
        .fetch_one(&mut *conn)
        .await?;

        let rows = sqlx::query_as::<_, BillRow>(bill_select!(
            "WHERE (?1 IS NULL OR created_by = ?1) ",
            "AND (?2 IS NULL OR lower(bill_number) LIKE ?2 OR lower(customer_name) LIKE ?2) ",
            "AND (?3 IS NULL OR payment_status = ?3) ",
            "ORDER BY created_at DESC, rowid DESC LIMIT ?4 OFFSET ?5"
        ))
        .bind(creator)
        .bind(&pattern)
        .bind(filter.status)
        .bind(i64::from(limit))
        .bind(i64::from(page - 1) * i64::from(limit))
        .fetch_all(&mut *conn)
        .await?;

        let bills = Self::assemble_all(&mut conn, rows).await?;
        let total_pages = ((total_bills + i64::from(limit) - 1) / i64::from(limit)) as u32;

        Ok(BillPage {
            bills,
            total_pages,
            current_page: page,
            total_bills,
        })
    }

    /// Every bill in scope matching an optional search, newest first.
    pub async fn list_all(&self, scope: &BillScope, search: Option<&str>) -> DbResult<Vec<Bill>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, BillRow>(bill_select!(
            "WHERE (?1 IS NULL OR created_by = ?1) ",
            "AND (?2 IS NULL OR lower(bill_number) LIKE ?2 OR lower(customer_name) LIKE ?2) ",
            "ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(scope.creator())
        .bind(pattern)
        .fetch_all(&mut *conn)
        .await?;

        Self::assemble_all(&mut conn, rows).await
    }

    pub async fn by_status(&self, scope: &BillScope, status: PaymentStatus) -> DbResult<Vec<Bill>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, BillRow>(bill_select!(
            "WHERE (?1 IS NULL OR created_by = ?1) AND payment_status = ?2 ",
            "ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(scope.creator())
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;

        Self::assemble_all(&mut conn, rows).await
    }

    /// Bills produced by exchanges.
    pub async fn exchanged(&self, scope: &BillScope) -> DbResult<Vec<Bill>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, BillRow>(bill_select!(
            "WHERE (?1 IS NULL OR created_by = ?1) AND exchange_from IS NOT NULL ",
            "ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(scope.creator())
        .fetch_all(&mut *conn)
        .await?;

        Self::assemble_all(&mut conn, rows).await
    }

    pub async fn for_agent(&self, agent_name: &str) -> DbResult<Vec<Bill>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, BillRow>(bill_select!(
            "WHERE agent_name = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(agent_name.trim())
        .fetch_all(&mut *conn)
        .await?;

        Self::assemble_all(&mut conn, rows).await
    }

    /// `"BILL-0001 - Customer"` strings whose number or customer matches.
    pub async fn suggestions(
        &self,
        scope: &BillScope,
        query: &str,
        limit: usize,
    ) -> DbResult<Vec<String>> {
        let pattern = format!("%{}%", query.trim().to_lowercase());

        let suggestions: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT bill_number || ' - ' || customer_name FROM bills
            WHERE (?1 IS NULL OR created_by = ?1)
              AND (lower(bill_number) LIKE ?2 OR lower(customer_name) LIKE ?2)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "#,
        )
        .bind(scope.creator())
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(suggestions)
    }

    /// Header facts for reports, newest first.
    pub async fn facts(&self, scope: &BillScope) -> DbResult<Vec<BillFacts>> {
        let facts = sqlx::query_as::<_, BillFacts>(
            r#"
            SELECT b.id, b.bill_number, b.customer_name, b.customer_email, b.customer_phone,
                   b.payment_status, b.total_amount_cents, b.agent_name, b.commission_cents,
                   b.created_by, u.username AS creator_name, b.return_status,
                   b.exchange_from, b.created_at
            FROM bills b
            LEFT JOIN users u ON u.id = b.created_by
            WHERE (?1 IS NULL OR b.created_by = ?1)
            ORDER BY b.created_at DESC, b.rowid DESC
            "#,
        )
        .bind(scope.creator())
        .fetch_all(&self.pool)
        .await?;

        debug!(count = facts.len(), "Loaded bill facts");
        Ok(facts)
    }

    pub async fn count(&self, scope: &BillScope) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE (?1 IS NULL OR created_by = ?1)")
                .bind(scope.creator())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// Generates a new bill ID.
pub fn generate_bill_id() -> String {
    Uuid::new_v4().to_string()
}
