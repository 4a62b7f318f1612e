//! # Inventory Ledger
//!
//! The only code that changes `items.stock`.
//!
//! ## Conditional Debit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE items SET stock = stock - :q                                    │
//! │  WHERE id = :id AND stock >= :q                                         │
//! │       │                                                                 │
//! │       ├── 1 row  → done                                                 │
//! │       │                                                                 │
//! │       └── 0 rows → SELECT the item                                      │
//! │                     ├── absent  → ItemNotFound                          │
//! │                     └── present → InsufficientStock { available, .. }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Check and decrement are one statement, so two concurrent sales can
//! never both take the last unit. A failed debit changes nothing.
//!
//! Every operation comes in two forms: a method on [`InventoryLedger`] that
//! uses its own connection, and a `*_in` associated function that runs on
//! the caller's transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::WorkflowResult;
use crate::repository::item::ItemRepository;
use billbook_core::validation::validate_quantity;
use billbook_core::{CoreError, Item};

#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    pub async fn debit(&self, item_id: &str, quantity: i64) -> WorkflowResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::debit_in(&mut conn, item_id, quantity).await
    }

    pub async fn credit(&self, item_id: &str, quantity: i64) -> WorkflowResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::credit_in(&mut conn, item_id, quantity).await
    }

    pub async fn credit_by_name(&self, name: &str, quantity: i64) -> WorkflowResult<Item> {
        let mut conn = self.pool.acquire().await?;
        Self::credit_by_name_in(&mut conn, name, quantity).await
    }

    pub async fn stock_of(&self, item_id: &str) -> WorkflowResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::stock_of_in(&mut conn, item_id).await
    }

    // =========================================================================
    // Connection-scoped forms
    // =========================================================================

    /// Takes `quantity` units out of stock, or fails without changing it.
    pub async fn debit_in(
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
    ) -> WorkflowResult<()> {
        validate_quantity(quantity)?;

        let result = sqlx::query(
            r#"
            UPDATE items SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            debug!(item_id = %item_id, quantity, "Stock debited");
            return Ok(());
        }

        match ItemRepository::fetch_by_id(conn, item_id).await? {
            None => Err(CoreError::ItemNotFound(item_id.to_string()).into()),
            Some(item) => {
                Err(CoreError::insufficient_stock(item.name, item.stock, quantity).into())
            }
        }
    }

    /// Puts `quantity` units back into stock.
    pub async fn credit_in(
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
    ) -> WorkflowResult<()> {
        validate_quantity(quantity)?;

        let result = sqlx::query(
            "UPDATE items SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ItemNotFound(item_id.to_string()).into());
        }

        debug!(item_id = %item_id, quantity, "Stock credited");
        Ok(())
    }

    /// Credits the item with this name, for lines that carry no item id.
    ///
    /// No match is a hard `ItemNotFound`: stock must never silently go
    /// missing.
    pub async fn credit_by_name_in(
        conn: &mut SqliteConnection,
        name: &str,
        quantity: i64,
    ) -> WorkflowResult<Item> {
        let item = Self::unique_by_name_in(conn, name).await?;
        Self::credit_in(conn, &item.id, quantity).await?;
        Ok(item)
    }

    /// The one item called `name`. Fails with `AmbiguousItem` when several
    /// items share the name, so stock never moves on an arbitrary match.
    pub async fn unique_by_name_in(conn: &mut SqliteConnection, name: &str) -> WorkflowResult<Item> {
        let mut matches = ItemRepository::fetch_by_name(conn, name).await?;
        match matches.len() {
            0 => Err(CoreError::ItemNotFound(name.trim().to_string()).into()),
            1 => Ok(matches.remove(0)),
            _ => Err(CoreError::AmbiguousItem(name.trim().to_string()).into()),
        }
    }

    pub async fn stock_of_in(conn: &mut SqliteConnection, item_id: &str) -> WorkflowResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM items WHERE id = ?1")
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?;

        stock.ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()).into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
