//! # Item Repository
//!
//! Database operations for catalog items.
//!
//! ## Key Operations
//! - Lookup by id, or by normalized name (the degraded path old bills need)
//! - Substring listing
//! - Insert / delete
//!
//! Stock is **not** written here. Every stock change goes through
//! [`crate::ledger::InventoryLedger`].
//!
//! ## Connection-Scoped Reads
//! ```text
//! ItemRepository::get_by_id(&self, id)          ← own pooled connection
//! ItemRepository::fetch_by_id(&mut conn, id)    ← caller's transaction
//! ```
//! Workflows use the second form so their reads see their own writes.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use billbook_core::Item;

/// Repository for item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ItemRepository::new(pool);
/// let rice = repo.get_by_id(&id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, id).await
    }

    /// Items carrying `name` (trimmed, case-insensitive), oldest first.
    ///
    /// Names are unique only per (vendor, owner), so more than one can match.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Vec<Item>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_name(&mut conn, name).await
    }

    pub async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, cost_price_cents, sale_price_cents, stock,
                   vendor_name, category, commission_bps, owner_id, owner_role,
                   created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    pub async fn fetch_by_name(conn: &mut SqliteConnection, name: &str) -> DbResult<Vec<Item>> {
        let normalized = name.trim().to_lowercase();
        debug!(name = %normalized, "Resolving item by name");

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, cost_price_cents, sale_price_cents, stock,
                   vendor_name, category, commission_bps, owner_id, owner_role,
                   created_at, updated_at
            FROM items
            WHERE name = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(normalized)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Lists items, optionally filtered by a name/vendor/category substring.
    pub async fn list(&self, query: &str, limit: u32) -> DbResult<Vec<Item>> {
        let pattern = format!("%{}%", query.trim().to_lowercase());
        debug!(pattern = %pattern, limit, "Listing items");

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, cost_price_cents, sale_price_cents, stock,
                   vendor_name, category, commission_bps, owner_id, owner_role,
                   created_at, updated_at
            FROM items
            WHERE name LIKE ?1
               OR lower(vendor_name) LIKE ?1
               OR lower(category) LIKE ?1
            ORDER BY name, created_at
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Inserts an item. The name is expected to be normalized already.
    ///
    /// A duplicate (name, vendor, owner) surfaces as
    /// [`DbError::UniqueViolation`] on `items`.
    pub async fn insert(&self, item: &Item) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, cost_price_cents, sale_price_cents, stock,
                vendor_name, category, commission_bps, owner_id, owner_role,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.cost_price_cents)
        .bind(item.sale_price_cents)
        .bind(item.stock)
        .bind(&item.vendor_name)
        .bind(&item.category)
        .bind(item.commission_bps)
        .bind(&item.owner_id)
        .bind(item.owner_role)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Generates a new item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}
