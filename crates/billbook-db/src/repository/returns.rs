//! # Return Repository
//!
//! Return requests awaiting review, and the return records approved
//! requests leave behind on a bill.
//!
//! ## State Transitions
//! ```text
//! return_requests.status          return_records.refund_allotted
//! ──────────────────────          ──────────────────────────────
//!   Pending ──► Approved            false ──► true
//!      │                              (only when status = Approved)
//!      └──────► Rejected
//! ```
//! Both transitions are conditional UPDATEs, so a second caller racing the
//! first sees zero affected rows instead of flipping twice.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use billbook_core::{ReturnProduct, ReturnRecord, ReturnRequest, ReturnStatus};

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: String,
    bill_id: String,
    bill_number: String,
    reason: String,
    requested_by: String,
    status: ReturnStatus,
    refunded: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_request(self, products: Vec<ReturnProduct>) -> ReturnRequest {
        ReturnRequest {
            id: self.id,
            bill_id: self.bill_id,
            bill_number: self.bill_number,
            reason: self.reason,
            products,
            requested_by: self.requested_by,
            status: self.status,
            refunded: self.refunded,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RequestListRow {
    #[sqlx(flatten)]
    request: RequestRow,
    customer_name: Option<String>,
    requester_name: Option<String>,
}

/// A request as listed for review, joined with its bill and requester.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequestView {
    #[serde(flatten)]
    pub request: ReturnRequest,
    pub customer_name: Option<String>,
    pub requester_name: Option<String>,
}

/// Repository for return requests and return records.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    // =========================================================================
    // Requests
    // =========================================================================

    pub async fn insert_request(conn: &mut SqliteConnection, request: &ReturnRequest) -> DbResult<()> {
        debug!(id = %request.id, bill_id = %request.bill_id, "Inserting return request");

        sqlx::query(
            r#"
            INSERT INTO return_requests (
                id, bill_id, bill_number, reason, requested_by,
                status, refunded, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&request.id)
        .bind(&request.bill_id)
        .bind(&request.bill_number)
        .bind(&request.reason)
        .bind(&request.requested_by)
        .bind(request.status)
        .bind(request.refunded)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *conn)
        .await?;

        for (position, product) in request.products.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO return_request_products (
                    id, request_id, position, item_id, item_name, quantity, sale_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&request.id)
            .bind(position as i64)
            .bind(&product.item_id)
            .bind(&product.item_name)
            .bind(product.quantity)
            .bind(product.sale_price_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    pub async fn get_request(&self, id: &str) -> DbResult<Option<ReturnRequest>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_request(&mut conn, id).await
    }

    pub async fn fetch_request(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<ReturnRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, bill_id, bill_number, reason, requested_by,
                   status, refunded, created_at, updated_at
            FROM return_requests
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let products = Self::fetch_products(conn, &row.id).await?;
                Ok(Some(row.into_request(products)))
            }
            None => Ok(None),
        }
    }

    async fn fetch_products(
        conn: &mut SqliteConnection,
        request_id: &str,
    ) -> DbResult<Vec<ReturnProduct>> {
        let products = sqlx::query_as::<_, ReturnProduct>(
            r#"
            SELECT item_id, item_name, quantity, sale_price_cents
            FROM return_request_products
            WHERE request_id = ?1
            ORDER BY position
            "#,
        )
        .bind(request_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(products)
    }

    /// Lists requests newest first; `requested_by = None` lists everyone's.
    pub async fn list_requests(&self, requested_by: Option<&str>) -> DbResult<Vec<ReturnRequestView>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, RequestListRow>(
            r#"
            SELECT r.id, r.bill_id, r.bill_number, r.reason, r.requested_by,
                   r.status, r.refunded, r.created_at, r.updated_at,
                   b.customer_name AS customer_name,
                   u.username AS requester_name
            FROM return_requests r
            LEFT JOIN bills b ON b.id = r.bill_id
            LEFT JOIN users u ON u.id = r.requested_by
            WHERE (?1 IS NULL OR r.requested_by = ?1)
            ORDER BY r.created_at DESC, r.rowid DESC
            "#,
        )
        .bind(requested_by)
        .fetch_all(&mut *conn)
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let products = Self::fetch_products(&mut conn, &row.request.id).await?;
            views.push(ReturnRequestView {
                request: row.request.into_request(products),
                customer_name: row.customer_name,
                requester_name: row.requester_name,
            });
        }
        Ok(views)
    }

    /// Moves a Pending request to `status`.
    ///
    /// Returns false when the request was no longer Pending.
    pub async fn resolve_request(
        conn: &mut SqliteConnection,
        id: &str,
        status: ReturnStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE return_requests SET status = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'Pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Records
    // =========================================================================

    pub async fn insert_record(conn: &mut SqliteConnection, record: &ReturnRecord) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO return_records (
                id, bill_id, request_id, item_id, item_name, quantity,
                sale_price_cents, status, refund_allotted, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&record.id)
        .bind(&record.bill_id)
        .bind(&record.request_id)
        .bind(&record.item_id)
        .bind(&record.item_name)
        .bind(record.quantity)
        .bind(record.sale_price_cents)
        .bind(record.status)
        .bind(record.refund_allotted)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn fetch_record(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<ReturnRecord>> {
        let record = sqlx::query_as::<_, ReturnRecord>(
            r#"
            SELECT id, bill_id, request_id, item_id, item_name, quantity,
                   sale_price_cents, status, refund_allotted, created_at
            FROM return_records
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(record)
    }

    pub async fn fetch_records_for_bill(
        conn: &mut SqliteConnection,
        bill_id: &str,
    ) -> DbResult<Vec<ReturnRecord>> {
        let records = sqlx::query_as::<_, ReturnRecord>(
            r#"
            SELECT id, bill_id, request_id, item_id, item_name, quantity,
                   sale_price_cents, status, refund_allotted, created_at
            FROM return_records
            WHERE bill_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(records)
    }

    /// Flips `refund_allotted` on one approved, unallotted record.
    ///
    /// Returns false when nothing was eligible.
    pub async fn allot_record(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE return_records SET refund_allotted = 1
            WHERE id = ?1 AND status = 'Approved' AND refund_allotted = 0
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Flips `refund_allotted` on every approved, unallotted record of a bill.
    pub async fn allot_bill(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE return_records SET refund_allotted = 1
            WHERE bill_id = ?1 AND status = 'Approved' AND refund_allotted = 0
            "#,
        )
        .bind(bill_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
