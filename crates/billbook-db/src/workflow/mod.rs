//! # Workflows
//!
//! Multi-step operations that must succeed or fail as a whole.
//!
//! ## Shape of Every Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Validate input (billbook-core)            nothing written yet       │
//! │  2. BEGIN                                                               │
//! │  3. Reads + ledger moves + inserts on the tx  any error → ROLLBACK      │
//! │  4. COMMIT                                                              │
//! │  5. Notifications (best effort)               failure → warn! only      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`billing::BillingEngine`] - create / update / delete bills
//! - [`returns::ReturnWorkflow`] - return requests, approval, refunds
//! - [`exchange::ExchangeWorkflow`] - item swaps producing a new bill
//! - [`catalog::Catalog`] - item creation and removal

pub mod billing;
pub mod catalog;
pub mod exchange;
pub mod returns;

use sqlx::SqliteConnection;
use tracing::warn;

pub use crate::error::{WorkflowError, WorkflowResult};
use crate::error::DbError;
use crate::ledger::InventoryLedger;
use crate::repository::item::ItemRepository;
use crate::repository::notification::NewNotification;
use crate::Database;
use billbook_core::{CoreError, Item, ValidationError};

/// Resolves an item by id, falling back to its name.
///
/// `ItemNotFound` names whichever reference the caller gave.
pub(crate) async fn resolve_item(
    conn: &mut SqliteConnection,
    item_id: Option<&str>,
    item_name: Option<&str>,
) -> WorkflowResult<Item> {
    let item_id = item_id.map(str::trim).filter(|id| !id.is_empty());
    let item_name = item_name.map(str::trim).filter(|name| !name.is_empty());

    match (item_id, item_name) {
        (Some(id), _) => ItemRepository::fetch_by_id(conn, id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()).into()),
        (None, Some(name)) => InventoryLedger::unique_by_name_in(conn, name).await,
        (None, None) => Err(ValidationError::required("itemId").into()),
    }
}

/// Turns a unique violation on `bills` into `DuplicateBillNumber`.
pub(crate) fn lift_duplicate(err: DbError, bill_number: &str) -> WorkflowError {
    if err.is_unique_violation_on("bills") {
        CoreError::DuplicateBillNumber(bill_number.to_string()).into()
    } else {
        err.into()
    }
}

/// Writes a notification; a failure is logged and swallowed.
pub(crate) async fn deliver(db: &Database, user_id: &str, note: &NewNotification) {
    if let Err(err) = db.notifications().notify(user_id, note).await {
        warn!(user_id = %user_id, kind = ?note.kind, error = %err, "Notification not delivered");
    }
}

/// Writes a notification to every admin; a failure is logged and swallowed.
pub(crate) async fn deliver_to_admins(db: &Database, note: &NewNotification) {
    match db.notifications().notify_admins(note).await {
        Ok(0) => warn!(kind = ?note.kind, "No admins to notify"),
        Ok(_) => {}
        Err(err) => warn!(kind = ?note.kind, error = %err, "Admin notification not delivered"),
    }
}
