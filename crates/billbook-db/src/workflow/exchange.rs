//! # Exchange Workflow
//!
//! Swaps items sold on a bill for other catalog items and issues a new,
//! fully paid bill for what the customer walks out with.
//!
//! ## One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├── original bill, actor, single-use gate, window                     │
//! │   ├── per line:                                                         │
//! │   │     old item ──► on the original, ≤ sold qty ──► credit old_qty     │
//! │   │     new item ──► conditional debit qty (InsufficientStock)          │
//! │   ├── new bill  <orig>-EX<millis>, Paid, exchange_from = original       │
//! │   └── INSERT bill + lines + exchange records                            │
//! │  COMMIT                                                                 │
//! │  notify actor + admins                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The original bill is never modified.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::billing::bill_time;
use super::{deliver, deliver_to_admins, lift_duplicate, resolve_item};
use crate::error::WorkflowResult;
use crate::ledger::InventoryLedger;
use crate::repository::bill::{generate_bill_id, BillRepository};
use crate::repository::notification::NewNotification;
use crate::repository::user::UserRepository;
use crate::Database;
use billbook_core::billing::{exchange_bill_number, resolve_payment_method};
use billbook_core::exchange::{exchange_totals, ExchangeLine};
use billbook_core::validation::{normalize_optional, validate_line_count, validate_quantity};
use billbook_core::{
    notice, Bill, CoreError, ExchangeRecord, NotificationKind, PaymentStatus,
    Principal, ReturnPolicy, Role, ValidationError,
};

/// One requested swap. Items are named by id or by name.
#[derive(Debug, Clone, Default)]
pub struct ExchangeLineRequest {
    pub old_item_id: Option<String>,
    pub old_item_name: Option<String>,
    /// Defaults to 1.
    pub old_quantity: Option<i64>,
    pub new_item_id: Option<String>,
    pub new_item_name: Option<String>,
    pub quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExchangeRequest {
    pub bill_id: String,
    pub lines: Vec<ExchangeLineRequest>,
    /// Overrides the original bill's payment method.
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExchangeWorkflow {
    db: Database,
    policy: ReturnPolicy,
}

impl ExchangeWorkflow {
    pub fn new(db: Database, policy: ReturnPolicy) -> Self {
        ExchangeWorkflow { db, policy }
    }

    /// Performs the exchange and returns the new bill.
    pub async fn handle_exchange(
        &self,
        actor: &Principal,
        request: ExchangeRequest,
    ) -> WorkflowResult<Bill> {
        validate_line_count("items", &request.lines)?;
        if actor.role == Role::Admin {
            return Err(CoreError::Forbidden("Admins cannot perform exchanges".to_string()).into());
        }

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let original = BillRepository::fetch_by_id(&mut *tx, &request.bill_id)
            .await?
            .ok_or_else(|| CoreError::BillNotFound(request.bill_id.clone()))?;
        let user = UserRepository::fetch_by_id(&mut *tx, &actor.id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(actor.id.clone()))?;

        let exchanged = BillRepository::has_exchange_child(&mut *tx, &original.id).await?;
        self.policy.ensure_open(&original, exchanged, now)?;

        // An original paid by nothing (N/A) has no tender to copy.
        let method_raw = request
            .payment_method
            .as_deref()
            .unwrap_or(original.payment_method.as_str());
        let payment_method = resolve_payment_method(PaymentStatus::Paid, Some(method_raw))?;

        let mut lines = Vec::with_capacity(request.lines.len());
        let mut handed_back = vec![0_i64; original.lines.len()];
        for line in &request.lines {
            validate_quantity(line.quantity)?;
            let old_quantity = line.old_quantity.unwrap_or(1);
            validate_quantity(old_quantity)?;

            let old =
                resolve_item(&mut *tx, line.old_item_id.as_deref(), line.old_item_name.as_deref())
                    .await?;
            let index = original
                .lines
                .iter()
                .position(|billed| billed.refers_to(Some(old.id.as_str()), &old.name))
                .ok_or_else(|| ValidationError::InvalidFormat {
                    field: "oldItem".to_string(),
                    reason: format!("{} is not on bill {}", old.name, original.bill_number),
                })?;

            // Across all lines, no more of an item comes back than was sold.
            handed_back[index] += old_quantity;
            let sold = original.lines[index].quantity;
            if handed_back[index] > sold {
                return Err(ValidationError::OutOfRange {
                    field: format!("oldQuantity of {}", old.name),
                    min: 1,
                    max: sold,
                }
                .into());
            }

            let new =
                resolve_item(&mut *tx, line.new_item_id.as_deref(), line.new_item_name.as_deref())
                    .await?;

            InventoryLedger::credit_in(&mut *tx, &old.id, old_quantity).await?;
            InventoryLedger::debit_in(&mut *tx, &new.id, line.quantity).await?;

            lines.push(ExchangeLine {
                old_item_id: old.id.clone(),
                old_item_name: old.name.clone(),
                old_quantity,
                old_price: old.sale_price(),
                new_item_id: new.id.clone(),
                new_item_name: new.name.clone(),
                new_quantity: line.quantity,
                new_price: new.sale_price(),
                new_cost_price: new.cost_price(),
                reason: normalize_optional(line.reason.as_deref()),
            });
        }

        let totals = exchange_totals(&lines);
        let bill_id = generate_bill_id();
        let exchanges = lines
            .iter()
            .map(|line| ExchangeRecord {
                id: Uuid::new_v4().to_string(),
                bill_id: bill_id.clone(),
                old_item: line.old_item_name.clone(),
                old_item_quantity: line.old_quantity,
                old_item_price_cents: line.old_price.cents(),
                new_item: line.new_item_name.clone(),
                new_item_quantity: line.new_quantity,
                new_item_price_cents: line.new_price.cents(),
                quantity: line.new_quantity,
                reason: line.reason.clone(),
                difference_cents: line.difference().cents(),
                refunded: false,
                created_at: now,
            })
            .collect();

        let bill = Bill {
            id: bill_id,
            bill_number: exchange_bill_number(&original.bill_number, now.timestamp_millis()),
            customer_name: original.customer_name.clone(),
            customer_phone: original.customer_phone.clone(),
            customer_email: original.customer_email.clone(),
            bill_date: now,
            bill_time: bill_time(now),
            payment_status: PaymentStatus::Paid,
            payment_method,
            lines: lines.iter().map(ExchangeLine::new_bill_line).collect(),
            sub_total_cents: totals.sub_total.cents(),
            discount_bps: 0,
            discount_amount_cents: totals.discount_amount.cents(),
            tax_bps: 0,
            tax_amount_cents: totals.tax_amount.cents(),
            total_amount_cents: totals.total.cents(),
            amount_paid_cents: totals.amount_paid.cents(),
            balance_due_cents: totals.balance_due.cents(),
            agent_name: None,
            commission_cents: 0,
            created_by: user.id.clone(),
            return_status: None,
            refund_amount_cents: 0,
            returns: Vec::new(),
            exchanges,
            exchange_from: Some(original.id.clone()),
            created_at: now,
            updated_at: now,
        };

        BillRepository::insert(&mut *tx, &bill)
            .await
            .map_err(|e| lift_duplicate(e, &bill.bill_number))?;
        tx.commit().await?;

        info!(
            original = %original.bill_number,
            bill_number = %bill.bill_number,
            lines = lines.len(),
            actor = %user.username,
            "Exchange completed"
        );

        let data = serde_json::json!({ "billId": bill.id, "originalBillId": original.id });
        let link = notice::exchange_link(&bill.id);

        let to_actor = NewNotification::new(
            NotificationKind::Exchange,
            notice::exchange_completed(&original, &lines),
        )
        .link(link.clone())
        .data(data.clone());
        deliver(&self.db, &user.id, &to_actor).await;

        let to_admins = NewNotification::new(
            NotificationKind::Exchange,
            notice::exchange_completed_for_admin(&original, &lines, &user.username),
        )
        .link(link)
        .data(data);
        deliver_to_admins(&self.db, &to_admins).await;

        Ok(bill)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::test_support::{insert_item, principal, test_db};
    use crate::workflow::billing::{BillingEngine, LineRequest, NewBill};
    use crate::workflow::returns::ReturnWorkflow;
    use billbook_core::{Item, Money, PaymentMethod, ReturnProduct};

    struct Fixture {
        db: Database,
        editor: Principal,
        admin: Principal,
        workflow: ExchangeWorkflow,
        kurta: Item,
        shirt: Item,
        bill: Bill,
    }

    /// Bill with 1 × kurta @ 100 (paid by card); shirt @ 150 has 5 in stock.
    async fn fixture() -> Fixture {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let admin = principal(&db, "admin", Role::Admin).await;
        let kurta = insert_item(&db, "Kurta", 10_000, 3).await;
        let shirt = insert_item(&db, "Shirt", 15_000, 5).await;

        let request = NewBill {
            customer_name: "Asha".to_string(),
            payment_status: Some("Paid".to_string()),
            payment_method: Some("Card".to_string()),
            lines: vec![LineRequest {
                item_id: Some(kurta.id.clone()),
                quantity: 1,
                ..Default::default()
            }],
            ..Default::default()
        };
        let bill = BillingEngine::new(db.clone())
            .create_bill(&editor, request)
            .await
            .unwrap();

        Fixture {
            workflow: ExchangeWorkflow::new(db.clone(), ReturnPolicy::default()),
            db,
            editor,
            admin,
            kurta,
            shirt,
            bill,
        }
    }

    fn swap(f: &Fixture) -> ExchangeRequest {
        ExchangeRequest {
            bill_id: f.bill.id.clone(),
            lines: vec![ExchangeLineRequest {
                old_item_id: Some(f.kurta.id.clone()),
                new_item_id: Some(f.shirt.id.clone()),
                quantity: 1,
                reason: Some("size".to_string()),
                ..Default::default()
            }],
            payment_method: None,
        }
    }

    #[tokio::test]
    async fn test_exchange_conserves_stock() {
        let f = fixture().await;
        assert_eq!(f.db.ledger().stock_of(&f.kurta.id).await.unwrap(), 2);

        let bill = f.workflow.handle_exchange(&f.editor, swap(&f)).await.unwrap();

        assert_eq!(f.db.ledger().stock_of(&f.kurta.id).await.unwrap(), 3);
        assert_eq!(f.db.ledger().stock_of(&f.shirt.id).await.unwrap(), 4);

        assert!(bill.bill_number.starts_with(&format!("{}-EX", f.bill.bill_number)));
        assert_eq!(bill.exchange_from.as_deref(), Some(f.bill.id.as_str()));
        assert_eq!(bill.payment_status, PaymentStatus::Paid);
        assert_eq!(bill.payment_method, PaymentMethod::Card);
        assert_eq!(bill.total_amount_cents, 15_000);
        assert_eq!(bill.amount_paid_cents, 15_000);
        assert_eq!(bill.balance_due_cents, 0);
        assert_eq!(bill.exchanges.len(), 1);
        assert_eq!(bill.exchanges[0].difference_cents, Money::from_major(50).cents());
        assert_eq!(bill.created_by, f.editor.id);

        let stored = f.db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
        assert_eq!(stored.exchanges[0].old_item, "kurta");
        assert_eq!(stored.lines[0].item_name, "shirt");

        let original = f.db.bills().get_by_id(&f.bill.id).await.unwrap().unwrap();
        assert_eq!(original.total_amount_cents, f.bill.total_amount_cents);
        assert_eq!(original.lines, f.bill.lines);
    }

    #[tokio::test]
    async fn test_exchange_notifies_actor_and_admins() {
        let f = fixture().await;
        let bill = f.workflow.handle_exchange(&f.editor, swap(&f)).await.unwrap();

        let mine = f.db.notifications().list_for_user(&f.editor.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine[0].message.contains("has been successfully exchanged with"));
        assert_eq!(mine[0].link.as_deref(), Some(format!("/exchanged-bill/{}", bill.id).as_str()));

        let admins = f.db.notifications().list_for_user(&f.admin.id).await.unwrap();
        assert!(admins[0].message.starts_with("Exchange by editor:"));
    }

    #[tokio::test]
    async fn test_exchange_is_single_use() {
        let f = fixture().await;
        let bill = f.workflow.handle_exchange(&f.editor, swap(&f)).await.unwrap();

        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, swap(&f)).await,
            Err(WorkflowError::Rejected(CoreError::AlreadyProcessed(_)))
        ));

        let mut again = swap(&f);
        again.bill_id = bill.id.clone();
        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, again).await,
            Err(WorkflowError::Rejected(CoreError::AlreadyProcessed(_)))
        ));

        let returns = ReturnWorkflow::new(f.db.clone(), ReturnPolicy::default());
        let product = ReturnProduct {
            item_id: None,
            item_name: "kurta".to_string(),
            quantity: 1,
            sale_price_cents: 0,
        };
        assert!(matches!(
            returns.submit(&f.editor, &f.bill.id, "changed mind", vec![product]).await,
            Err(WorkflowError::Rejected(CoreError::AlreadyProcessed(_)))
        ));
    }

    #[tokio::test]
    async fn test_old_quantity_capped_at_sold_quantity() {
        let f = fixture().await;

        let mut request = swap(&f);
        request.lines[0].old_quantity = Some(500);
        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, request).await,
            Err(WorkflowError::Rejected(CoreError::Validation(_)))
        ));

        // One kurta sold, split over two lines
        let mut request = swap(&f);
        let second = request.lines[0].clone();
        request.lines.push(second);
        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, request).await,
            Err(WorkflowError::Rejected(CoreError::Validation(_)))
        ));

        assert_eq!(f.db.ledger().stock_of(&f.kurta.id).await.unwrap(), 2);
        assert_eq!(f.db.ledger().stock_of(&f.shirt.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back() {
        let f = fixture().await;
        let mut request = swap(&f);
        request.lines[0].quantity = 6;

        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, request).await,
            Err(WorkflowError::Rejected(CoreError::InsufficientStock { available: 5, .. }))
        ));
        assert_eq!(f.db.ledger().stock_of(&f.kurta.id).await.unwrap(), 2);
        assert_eq!(f.db.ledger().stock_of(&f.shirt.id).await.unwrap(), 5);
        assert!(f.db.bills().exchanged(&billbook_core::BillScope::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_rejections() {
        let f = fixture().await;

        assert!(matches!(
            f.workflow.handle_exchange(&f.admin, swap(&f)).await,
            Err(WorkflowError::Rejected(CoreError::Forbidden(_)))
        ));

        let mut empty = swap(&f);
        empty.lines.clear();
        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, empty).await,
            Err(WorkflowError::Rejected(CoreError::Validation(_)))
        ));

        let mut missing = swap(&f);
        missing.bill_id = "missing".to_string();
        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, missing).await,
            Err(WorkflowError::Rejected(CoreError::BillNotFound(_)))
        ));

        let stranger = Principal {
            id: "nobody".to_string(),
            username: "nobody".to_string(),
            role: Role::Customer,
        };
        assert!(matches!(
            f.workflow.handle_exchange(&stranger, swap(&f)).await,
            Err(WorkflowError::Rejected(CoreError::UserNotFound(_)))
        ));

        let mut ghost = swap(&f);
        ghost.lines[0].new_item_id = None;
        ghost.lines[0].new_item_name = Some("Saree".to_string());
        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, ghost).await,
            Err(WorkflowError::Rejected(CoreError::ItemNotFound(name))) if name == "Saree"
        ));

        let mut not_on_bill = swap(&f);
        not_on_bill.lines[0].old_item_id = Some(f.shirt.id.clone());
        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, not_on_bill).await,
            Err(WorkflowError::Rejected(CoreError::Validation(_)))
        ));

        let mut no_tender = swap(&f);
        no_tender.payment_method = Some("N/A".to_string());
        assert!(matches!(
            f.workflow.handle_exchange(&f.editor, no_tender).await,
            Err(WorkflowError::Rejected(CoreError::InvalidPaymentMethod(_)))
        ));

        assert_eq!(f.db.ledger().stock_of(&f.kurta.id).await.unwrap(), 2);
        assert_eq!(f.db.ledger().stock_of(&f.shirt.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_exchange_by_name_with_override() {
        let f = fixture().await;
        let request = ExchangeRequest {
            bill_id: f.bill.id.clone(),
            lines: vec![ExchangeLineRequest {
                old_item_name: Some("KURTA".to_string()),
                new_item_name: Some("shirt".to_string()),
                quantity: 2,
                ..Default::default()
            }],
            payment_method: Some("upi".to_string()),
        };

        let bill = f.workflow.handle_exchange(&f.editor, request).await.unwrap();
        assert_eq!(bill.payment_method, PaymentMethod::Upi);
        assert_eq!(bill.total_amount_cents, 30_000);
        assert_eq!(bill.exchanges[0].difference_cents, 20_000);
        assert_eq!(f.db.ledger().stock_of(&f.shirt.id).await.unwrap(), 3);
    }
}
