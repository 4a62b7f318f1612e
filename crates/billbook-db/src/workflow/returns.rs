//! # Return Workflow
//!
//! Return requests, their review, and refund tracking.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit ──► request Pending, bill.return_status = Pending               │
//! │               │                          (admins notified)              │
//! │               ├── approve ──► stock credited per product                │
//! │               │               one ReturnRecord per product              │
//! │               │               bill.return_status = Approved             │
//! │               │                          (requester notified)           │
//! │               │                    │                                    │
//! │               │                    └── allot_refund(record)             │
//! │               │                        refund_allotted = true           │
//! │               │                        bill.refund_amount recomputed    │
//! │               │                                                         │
//! │               └── reject ───► bill.return_status = Rejected             │
//! │                               no stock effect, bill may be resubmitted  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use super::{deliver, deliver_to_admins};
use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::InventoryLedger;
use crate::repository::bill::BillRepository;
use crate::repository::notification::NewNotification;
use crate::repository::returns::{ReturnRepository, ReturnRequestView};
use crate::Database;
use billbook_core::policy::resolve_return_products;
use billbook_core::validation::{validate_reason, validate_uuid};
use billbook_core::{
    notice, Bill, Capability, CoreError, Money, NotificationKind, Principal, ReturnPolicy,
    ReturnProduct, ReturnRecord, ReturnRequest, ReturnStatus,
};

/// Result of allotting a refund on one return record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOutcome {
    pub record: ReturnRecord,
    /// True when the record had been allotted before this call.
    pub already_allotted: bool,
    pub refund_amount: Money,
}

/// Result of allotting every approved return of a bill.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRefund {
    pub bill_id: String,
    pub allotted: u64,
    pub refund_amount: Money,
}

#[derive(Debug, Clone)]
pub struct ReturnWorkflow {
    db: Database,
    policy: ReturnPolicy,
}

impl ReturnWorkflow {
    pub fn new(db: Database, policy: ReturnPolicy) -> Self {
        ReturnWorkflow { db, policy }
    }

    /// Opens a return request on a bill.
    pub async fn submit(
        &self,
        requester: &Principal,
        bill_id: &str,
        reason: &str,
        products: Vec<ReturnProduct>,
    ) -> WorkflowResult<ReturnRequest> {
        if products.is_empty() {
            return Err(CoreError::EmptyProductList.into());
        }
        let reason = validate_reason(reason)?;
        let now = Utc::now();

        let mut tx = self.db.pool().begin().await?;

        let bill = load_bill(&mut *tx, bill_id).await?;
        let exchanged = BillRepository::has_exchange_child(&mut *tx, &bill.id).await?;
        self.policy.ensure_open(&bill, exchanged, now)?;
        let products = resolve_return_products(&bill, products)?;

        let request = ReturnRequest {
            id: Uuid::new_v4().to_string(),
            bill_id: bill.id.clone(),
            bill_number: bill.bill_number.clone(),
            reason,
            products,
            requested_by: requester.id.clone(),
            status: ReturnStatus::Pending,
            refunded: false,
            created_at: now,
            updated_at: now,
        };

        ReturnRepository::insert_request(&mut *tx, &request).await?;
        BillRepository::set_return_status(&mut *tx, &bill.id, ReturnStatus::Pending).await?;
        tx.commit().await?;

        info!(
            request_id = %request.id,
            bill_number = %bill.bill_number,
            products = request.products.len(),
            requested_by = %requester.username,
            "Return requested"
        );

        let note = NewNotification::new(
            NotificationKind::ReturnRequest,
            notice::return_requested(&bill, &request.products),
        )
        .data(serde_json::json!({ "requestId": request.id, "billId": bill.id }));
        deliver_to_admins(&self.db, &note).await;

        Ok(request)
    }

    /// Approves a pending request: stock comes back and records are written.
    pub async fn approve(&self, request_id: &str) -> WorkflowResult<ReturnRequest> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let mut request = load_pending(&mut *tx, request_id).await?;
        let bill = load_bill(&mut *tx, &request.bill_id).await?;

        for product in &request.products {
            restock(&mut *tx, product).await?;
        }

        if !ReturnRepository::resolve_request(&mut *tx, &request.id, ReturnStatus::Approved).await? {
            return Err(already_processed(&request.id));
        }

        for product in &request.products {
            let record = ReturnRecord {
                id: Uuid::new_v4().to_string(),
                bill_id: bill.id.clone(),
                request_id: request.id.clone(),
                item_id: product.item_id.clone(),
                item_name: product.item_name.clone(),
                quantity: product.quantity,
                sale_price_cents: product.sale_price_cents,
                status: ReturnStatus::Approved,
                refund_allotted: false,
                created_at: now,
            };
            ReturnRepository::insert_record(&mut *tx, &record).await?;
        }

        BillRepository::set_return_status(&mut *tx, &bill.id, ReturnStatus::Approved).await?;
        tx.commit().await?;

        request.status = ReturnStatus::Approved;
        request.updated_at = now;
        info!(request_id = %request.id, bill_number = %bill.bill_number, "Return approved");

        let note = NewNotification::new(
            NotificationKind::Return,
            notice::return_approved(&bill, &request.products),
        )
        .data(serde_json::json!({ "requestId": request.id, "billId": bill.id }));
        deliver(&self.db, &request.requested_by, &note).await;

        Ok(request)
    }

    /// Rejects a pending request. Stock is untouched.
    pub async fn reject(&self, request_id: &str) -> WorkflowResult<ReturnRequest> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let mut request = load_pending(&mut *tx, request_id).await?;
        let bill = load_bill(&mut *tx, &request.bill_id).await?;

        if !ReturnRepository::resolve_request(&mut *tx, &request.id, ReturnStatus::Rejected).await? {
            return Err(already_processed(&request.id));
        }
        BillRepository::set_return_status(&mut *tx, &bill.id, ReturnStatus::Rejected).await?;
        tx.commit().await?;

        request.status = ReturnStatus::Rejected;
        request.updated_at = now;
        info!(request_id = %request.id, bill_number = %bill.bill_number, "Return rejected");

        let note = NewNotification::new(
            NotificationKind::Return,
            notice::return_rejected(&bill, &request.products),
        )
        .data(serde_json::json!({ "requestId": request.id, "billId": bill.id }));
        deliver(&self.db, &request.requested_by, &note).await;

        Ok(request)
    }

    /// Requests visible to `principal`: all of them for reviewers, their
    /// own for everyone else.
    pub async fn list_requests(&self, principal: &Principal) -> WorkflowResult<Vec<ReturnRequestView>> {
        let requested_by = if principal.role.can(Capability::ResolveReturn) {
            None
        } else {
            Some(principal.id.as_str())
        };
        Ok(self.db.returns().list_requests(requested_by).await?)
    }

    // =========================================================================
    // Refunds
    // =========================================================================

    /// Marks one approved return record as refunded.
    ///
    /// Calling it again on the same record changes nothing and reports
    /// `already_allotted`.
    pub async fn allot_refund(&self, return_id: &str) -> WorkflowResult<RefundOutcome> {
        let return_id = validate_uuid("returnId", return_id)
            .map_err(|_| CoreError::InvalidId(return_id.trim().to_string()))?;

        let mut tx = self.db.pool().begin().await?;

        let mut record = ReturnRepository::fetch_record(&mut *tx, &return_id)
            .await?
            .ok_or_else(|| CoreError::RecordNotFound(return_id.clone()))?;

        if record.refund_allotted {
            let bill = load_bill(&mut *tx, &record.bill_id).await?;
            return Ok(RefundOutcome {
                record,
                already_allotted: true,
                refund_amount: Money::from_cents(bill.refund_amount_cents),
            });
        }

        if !record.is_refund_eligible() || !ReturnRepository::allot_record(&mut *tx, &record.id).await? {
            return Err(CoreError::NoEligibleRecord(return_id).into());
        }

        let refund_amount = BillRepository::recompute_refund_amount(&mut *tx, &record.bill_id).await?;
        tx.commit().await?;

        record.refund_allotted = true;
        info!(
            return_id = %record.id,
            bill_id = %record.bill_id,
            refund_amount_cents = refund_amount,
            "Refund allotted"
        );

        Ok(RefundOutcome {
            record,
            already_allotted: false,
            refund_amount: Money::from_cents(refund_amount),
        })
    }

    /// Marks every approved, unrefunded return record of a bill as refunded.
    pub async fn refund_approved_for_bill(&self, bill_id: &str) -> WorkflowResult<BillRefund> {
        let mut tx = self.db.pool().begin().await?;

        let bill = load_bill(&mut *tx, bill_id).await?;
        let allotted = ReturnRepository::allot_bill(&mut *tx, &bill.id).await?;
        if allotted == 0 {
            return Err(CoreError::NoEligibleRecord(format!("bill {}", bill.bill_number)).into());
        }

        let refund_amount = BillRepository::recompute_refund_amount(&mut *tx, &bill.id).await?;
        tx.commit().await?;

        info!(bill_number = %bill.bill_number, allotted, "Bill refund allotted");
        Ok(BillRefund {
            bill_id: bill.id,
            allotted,
            refund_amount: Money::from_cents(refund_amount),
        })
    }
}

async fn load_bill(conn: &mut SqliteConnection, bill_id: &str) -> WorkflowResult<Bill> {
    BillRepository::fetch_by_id(conn, bill_id)
        .await?
        .ok_or_else(|| CoreError::BillNotFound(bill_id.to_string()).into())
}

async fn load_pending(conn: &mut SqliteConnection, request_id: &str) -> WorkflowResult<ReturnRequest> {
    let request = ReturnRepository::fetch_request(conn, request_id)
        .await?
        .ok_or_else(|| CoreError::RequestNotFound(request_id.to_string()))?;

    if !request.is_pending() {
        return Err(already_processed(&request.id));
    }
    Ok(request)
}

fn already_processed(request_id: &str) -> WorkflowError {
    CoreError::AlreadyProcessed(format!("Return request {}", request_id)).into()
}

/// Puts a returned product back into stock, by id when the item still
/// exists, else by name.
async fn restock(conn: &mut SqliteConnection, product: &ReturnProduct) -> WorkflowResult<()> {
    if let Some(item_id) = product.item_id.as_deref() {
        match InventoryLedger::credit_in(conn, item_id, product.quantity).await {
            Err(WorkflowError::Rejected(CoreError::ItemNotFound(_))) => {}
            other => return other,
        }
    }

    InventoryLedger::credit_by_name_in(conn, &product.item_name, product.quantity).await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_item, principal, test_db};
    use crate::workflow::billing::{BillingEngine, LineRequest, NewBill};
    use billbook_core::{Item, Role};

    struct Fixture {
        db: Database,
        editor: Principal,
        admin: Principal,
        workflow: ReturnWorkflow,
        rice: Item,
        bill: Bill,
    }

    async fn fixture() -> Fixture {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let admin = principal(&db, "admin", Role::Admin).await;
        let rice = insert_item(&db, "Rice", 5000, 10).await;

        let request = NewBill {
            customer_name: "Asha".to_string(),
            payment_status: Some("Paid".to_string()),
            lines: vec![LineRequest {
                item_id: Some(rice.id.clone()),
                quantity: 3,
                ..Default::default()
            }],
            ..Default::default()
        };
        let bill = BillingEngine::new(db.clone())
            .create_bill(&editor, request)
            .await
            .unwrap();

        Fixture {
            workflow: ReturnWorkflow::new(db.clone(), ReturnPolicy::default()),
            db,
            editor,
            admin,
            rice,
            bill,
        }
    }

    fn product(name: &str, quantity: i64) -> ReturnProduct {
        ReturnProduct {
            item_id: None,
            item_name: name.to_string(),
            quantity,
            sale_price_cents: 0,
        }
    }

    #[tokio::test]
    async fn test_submit_and_approve() {
        let f = fixture().await;

        let request = f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("Rice", 2)])
            .await
            .unwrap();
        assert_eq!(request.status, ReturnStatus::Pending);
        assert_eq!(request.products[0].sale_price_cents, 5000);
        assert_eq!(request.products[0].item_id.as_deref(), Some(f.rice.id.as_str()));

        let admin_inbox = f.db.notifications().list_for_user(&f.admin.id).await.unwrap();
        assert_eq!(admin_inbox.len(), 1);
        assert_eq!(admin_inbox[0].kind, NotificationKind::ReturnRequest);

        let approved = f.workflow.approve(&request.id).await.unwrap();
        assert_eq!(approved.status, ReturnStatus::Approved);
        assert_eq!(f.db.ledger().stock_of(&f.rice.id).await.unwrap(), 9);

        let bill = f.db.bills().get_by_id(&f.bill.id).await.unwrap().unwrap();
        assert_eq!(bill.return_status, Some(ReturnStatus::Approved));
        assert_eq!(bill.returns.len(), 1);
        assert_eq!(bill.returns[0].quantity, 2);
        assert!(!bill.returns[0].refund_allotted);

        let inbox = f.db.notifications().list_for_user(&f.editor.id).await.unwrap();
        assert!(inbox[0].message.ends_with("Please Provide Refund."));
    }

    #[tokio::test]
    async fn test_repeated_products_cannot_exceed_purchase() {
        let f = fixture().await;
        assert_eq!(f.db.ledger().stock_of(&f.rice.id).await.unwrap(), 7);

        let over = f
            .workflow
            .submit(
                &f.editor,
                &f.bill.id,
                "damaged",
                vec![product("rice", 2), product("rice", 2), product("rice", 2)],
            )
            .await;
        assert!(matches!(
            over,
            Err(WorkflowError::Rejected(CoreError::Validation(_)))
        ));

        let bill = f.db.bills().get_by_id(&f.bill.id).await.unwrap().unwrap();
        assert_eq!(bill.return_status, None);

        let request = f
            .workflow
            .submit(
                &f.editor,
                &f.bill.id,
                "damaged",
                vec![product("rice", 2), product("Rice", 1)],
            )
            .await
            .unwrap();
        f.workflow.approve(&request.id).await.unwrap();
        assert_eq!(f.db.ledger().stock_of(&f.rice.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_request_resolves_once() {
        let f = fixture().await;
        let request = f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 1)])
            .await
            .unwrap();

        f.workflow.approve(&request.id).await.unwrap();
        assert!(matches!(
            f.workflow.approve(&request.id).await,
            Err(WorkflowError::Rejected(CoreError::AlreadyProcessed(_)))
        ));
        assert!(matches!(
            f.workflow.reject(&request.id).await,
            Err(WorkflowError::Rejected(CoreError::AlreadyProcessed(_)))
        ));
        assert_eq!(f.db.ledger().stock_of(&f.rice.id).await.unwrap(), 8);

        assert!(matches!(
            f.workflow.approve("missing").await,
            Err(WorkflowError::Rejected(CoreError::RequestNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_single_use_gate() {
        let f = fixture().await;
        f.workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 1)])
            .await
            .unwrap();

        assert!(matches!(
            f.workflow
                .submit(&f.editor, &f.bill.id, "again", vec![product("rice", 1)])
                .await,
            Err(WorkflowError::Rejected(CoreError::AlreadyProcessed(_)))
        ));
    }

    #[tokio::test]
    async fn test_reject_then_resubmit() {
        let f = fixture().await;
        let request = f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 1)])
            .await
            .unwrap();

        let rejected = f.workflow.reject(&request.id).await.unwrap();
        assert_eq!(rejected.status, ReturnStatus::Rejected);
        assert_eq!(f.db.ledger().stock_of(&f.rice.id).await.unwrap(), 7);

        let bill = f.db.bills().get_by_id(&f.bill.id).await.unwrap().unwrap();
        assert_eq!(bill.return_status, Some(ReturnStatus::Rejected));

        f.workflow
            .submit(&f.editor, &f.bill.id, "second try", vec![product("rice", 1)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let f = fixture().await;

        assert!(matches!(
            f.workflow.submit(&f.editor, &f.bill.id, "damaged", vec![]).await,
            Err(WorkflowError::Rejected(CoreError::EmptyProductList))
        ));
        assert!(matches!(
            f.workflow
                .submit(&f.editor, "missing", "damaged", vec![product("rice", 1)])
                .await,
            Err(WorkflowError::Rejected(CoreError::BillNotFound(_)))
        ));
        assert!(f
            .workflow
            .submit(&f.editor, &f.bill.id, " ", vec![product("rice", 1)])
            .await
            .is_err());
        assert!(f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 4)])
            .await
            .is_err());
        assert!(f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("sugar", 1)])
            .await
            .is_err());

        let bill = f.db.bills().get_by_id(&f.bill.id).await.unwrap().unwrap();
        assert_eq!(bill.return_status, None);
    }

    #[tokio::test]
    async fn test_return_window() {
        let f = fixture().await;
        sqlx::query("UPDATE bills SET bill_date = ?2 WHERE id = ?1")
            .bind(&f.bill.id)
            .bind(Utc::now() - chrono::Duration::days(8))
            .execute(f.db.pool())
            .await
            .unwrap();

        assert!(matches!(
            f.workflow
                .submit(&f.editor, &f.bill.id, "late", vec![product("rice", 1)])
                .await,
            Err(WorkflowError::Rejected(CoreError::ReturnWindowExpired { days: 7, .. }))
        ));

        let unlimited = ReturnWorkflow::new(f.db.clone(), ReturnPolicy::unlimited());
        unlimited
            .submit(&f.editor, &f.bill.id, "late", vec![product("rice", 1)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_approve_restocks_by_name_when_item_replaced() {
        let f = fixture().await;
        let request = f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 2)])
            .await
            .unwrap();

        f.db.items().delete(&f.rice.id).await.unwrap();
        let replacement = insert_item(&f.db, "Rice", 5200, 0).await;

        f.workflow.approve(&request.id).await.unwrap();
        assert_eq!(f.db.ledger().stock_of(&replacement.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_approve_with_unknown_item_rolls_back() {
        let f = fixture().await;
        let request = f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 2)])
            .await
            .unwrap();

        f.db.items().delete(&f.rice.id).await.unwrap();
        assert!(matches!(
            f.workflow.approve(&request.id).await,
            Err(WorkflowError::Rejected(CoreError::ItemNotFound(_)))
        ));

        let stored = f.db.returns().get_request(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReturnStatus::Pending);
        let bill = f.db.bills().get_by_id(&f.bill.id).await.unwrap().unwrap();
        assert!(bill.returns.is_empty());
    }

    #[tokio::test]
    async fn test_allot_refund_is_idempotent() {
        let f = fixture().await;
        let request = f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 2)])
            .await
            .unwrap();
        f.workflow.approve(&request.id).await.unwrap();

        let bill = f.db.bills().get_by_id(&f.bill.id).await.unwrap().unwrap();
        let record_id = bill.returns[0].id.clone();

        let first = f.workflow.allot_refund(&record_id).await.unwrap();
        assert!(!first.already_allotted);
        assert_eq!(first.refund_amount, Money::from_cents(10_000));

        let second = f.workflow.allot_refund(&record_id).await.unwrap();
        assert!(second.already_allotted);
        assert_eq!(second.refund_amount, Money::from_cents(10_000));

        let bill = f.db.bills().get_by_id(&f.bill.id).await.unwrap().unwrap();
        assert_eq!(bill.refund_amount_cents, 10_000);
        assert!(bill.returns[0].refund_allotted);
    }

    #[tokio::test]
    async fn test_allot_refund_errors() {
        let f = fixture().await;

        assert!(matches!(
            f.workflow.allot_refund("not-a-uuid").await,
            Err(WorkflowError::Rejected(CoreError::InvalidId(_)))
        ));
        assert!(matches!(
            f.workflow
                .allot_refund("550e8400-e29b-41d4-a716-446655440000")
                .await,
            Err(WorkflowError::Rejected(CoreError::RecordNotFound(_)))
        ));
        assert!(matches!(
            f.workflow.refund_approved_for_bill(&f.bill.id).await,
            Err(WorkflowError::Rejected(CoreError::NoEligibleRecord(_)))
        ));
    }

    #[tokio::test]
    async fn test_refund_whole_bill() {
        let f = fixture().await;
        let request = f
            .workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 3)])
            .await
            .unwrap();
        f.workflow.approve(&request.id).await.unwrap();

        let refund = f.workflow.refund_approved_for_bill(&f.bill.id).await.unwrap();
        assert_eq!(refund.allotted, 1);
        assert_eq!(refund.refund_amount, Money::from_cents(15_000));

        assert!(matches!(
            f.workflow.refund_approved_for_bill(&f.bill.id).await,
            Err(WorkflowError::Rejected(CoreError::NoEligibleRecord(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_requests_scope() {
        let f = fixture().await;
        f.workflow
            .submit(&f.editor, &f.bill.id, "damaged", vec![product("rice", 1)])
            .await
            .unwrap();
        let other = principal(&f.db, "other", Role::Editor).await;

        let all = f.workflow.list_requests(&f.admin).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].customer_name.as_deref(), Some("Asha"));
        assert_eq!(all[0].requester_name.as_deref(), Some("editor"));

        assert_eq!(f.workflow.list_requests(&f.editor).await.unwrap().len(), 1);
        assert!(f.workflow.list_requests(&other).await.unwrap().is_empty());
    }
}
