//! # Billing Engine
//!
//! Creates, updates and deletes bills.
//!
//! ## Bill Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request                  (no transaction yet)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── per line: resolve item ──► ledger debit (conditional UPDATE)      │
//! │   │        ItemNotFound / InsufficientStock ──► ROLLBACK                │
//! │   ├── bill_sequence + 1 ──► BILL-0042 (skip numbers already taken)      │
//! │   ├── totals from lines                                                 │
//! │   └── INSERT bill + lines                                               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Stock is reserved before the bill exists, and both land in the same
//! transaction: there is never a bill without its debits, nor a debit
//! without its bill.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use super::{lift_duplicate, resolve_item};
use crate::error::{DbError, WorkflowResult};
use crate::ledger::InventoryLedger;
use crate::repository::bill::{generate_bill_id, BillFilter, BillPage, BillRepository};
use crate::Database;
use billbook_core::billing::{
    format_bill_number, normalize_payment, parse_payment_status, resolve_payment_method,
    BillTotals,
};
use billbook_core::validation::{
    normalize_email, normalize_optional, validate_customer_name, validate_line_count,
    validate_non_negative, validate_percentage, validate_quantity, validate_search_query,
};
use billbook_core::{
    Bill, BillLine, BillScope, CoreError, Money, PaymentStatus, Percentage, Principal,
    ValidationError, SUGGESTION_LIMIT,
};

/// Bill numbers tried before giving up with `DuplicateBillNumber`.
const NUMBER_ATTEMPTS: u32 = 3;

// =============================================================================
// Requests
// =============================================================================

/// One requested bill line. The item is named by id or by name.
#[derive(Debug, Clone, Default)]
pub struct LineRequest {
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub quantity: i64,
    /// Overrides the catalog sale price when set.
    pub sale_price: Option<Money>,
}

#[derive(Debug, Clone, Default)]
pub struct NewBill {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub lines: Vec<LineRequest>,
    pub discount: Percentage,
    pub tax: Percentage,
    pub amount_paid: Money,
    pub agent_name: Option<String>,
    pub commission: Money,
}

/// Changes to an existing bill. `None` leaves a field alone.
///
/// `bill_number` and `bill_date` exist only so a client sending them can
/// be told they are immutable.
#[derive(Debug, Clone, Default)]
pub struct BillPatch {
    pub bill_number: Option<String>,
    pub bill_date: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub amount_paid: Option<Money>,
    pub agent_name: Option<String>,
    pub commission: Option<Money>,
    pub discount: Option<Percentage>,
    pub tax: Option<Percentage>,
}

/// A request that passed validation.
struct CheckedBill {
    customer_name: String,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    payment: (PaymentStatus, billbook_core::PaymentMethod),
    lines: Vec<LineRequest>,
    discount: Percentage,
    tax: Percentage,
    amount_paid: Money,
    agent_name: Option<String>,
    commission: Money,
}

impl NewBill {
    fn check(self) -> WorkflowResult<CheckedBill> {
        let customer_name = validate_customer_name(&self.customer_name)?;
        validate_line_count("items", &self.lines)?;

        for line in &self.lines {
            validate_quantity(line.quantity)?;
            let named = [&line.item_id, &line.item_name]
                .into_iter()
                .flatten()
                .any(|reference| !reference.trim().is_empty());
            if !named {
                return Err(ValidationError::required("itemId").into());
            }
            if let Some(price) = line.sale_price {
                validate_non_negative("salePrice", price)?;
            }
        }

        let payment = normalize_payment(
            self.payment_status.as_deref(),
            self.payment_method.as_deref(),
        )?;

        validate_percentage("discount", self.discount)?;
        validate_percentage("tax", self.tax)?;
        validate_non_negative("amountPaid", self.amount_paid)?;
        validate_non_negative("commission", self.commission)?;

        Ok(CheckedBill {
            customer_name,
            customer_phone: normalize_optional(self.customer_phone.as_deref()),
            customer_email: normalize_email(self.customer_email.as_deref()),
            payment,
            lines: self.lines,
            discount: self.discount,
            tax: self.tax,
            amount_paid: self.amount_paid,
            agent_name: normalize_optional(self.agent_name.as_deref()),
            commission: self.commission,
        })
    }
}

/// Copies computed totals onto a bill header.
fn apply_totals(bill: &mut Bill, totals: &BillTotals) {
    bill.sub_total_cents = totals.sub_total.cents();
    bill.discount_amount_cents = totals.discount_amount.cents();
    bill.tax_amount_cents = totals.tax_amount.cents();
    bill.total_amount_cents = totals.total.cents();
    bill.amount_paid_cents = totals.amount_paid.cents();
    bill.balance_due_cents = totals.balance_due.cents();
}

pub(crate) fn bill_time(now: DateTime<Utc>) -> String {
    now.format("%H:%M").to_string()
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone)]
pub struct BillingEngine {
    db: Database,
}

impl BillingEngine {
    pub fn new(db: Database) -> Self {
        BillingEngine { db }
    }

    /// Creates a bill, debiting stock for every line.
    ///
    /// Nothing is written unless every line can be supplied.
    pub async fn create_bill(&self, principal: &Principal, request: NewBill) -> WorkflowResult<Bill> {
        let checked = request.check()?;
        let now = Utc::now();

        let mut tx = self.db.pool().begin().await?;

        let mut lines = Vec::with_capacity(checked.lines.len());
        for line in &checked.lines {
            let item =
                resolve_item(&mut *tx, line.item_id.as_deref(), line.item_name.as_deref()).await?;
            InventoryLedger::debit_in(&mut *tx, &item.id, line.quantity).await?;

            lines.push(BillLine {
                item_id: Some(item.id.clone()),
                item_name: item.name.clone(),
                quantity: line.quantity,
                cost_price_cents: item.cost_price_cents,
                sale_price_cents: line.sale_price.unwrap_or(item.sale_price()).cents(),
            });
        }

        let bill_number = allocate_number(&mut *tx).await?;
        let totals = BillTotals::from_lines(&lines, checked.discount, checked.tax, checked.amount_paid);
        let (payment_status, payment_method) = checked.payment;

        let mut bill = Bill {
            id: generate_bill_id(),
            bill_number,
            customer_name: checked.customer_name,
            customer_phone: checked.customer_phone,
            customer_email: checked.customer_email,
            bill_date: now,
            bill_time: bill_time(now),
            payment_status,
            payment_method,
            lines,
            sub_total_cents: 0,
            discount_bps: checked.discount.bps(),
            discount_amount_cents: 0,
            tax_bps: checked.tax.bps(),
            tax_amount_cents: 0,
            total_amount_cents: 0,
            amount_paid_cents: 0,
            balance_due_cents: 0,
            agent_name: checked.agent_name,
            commission_cents: checked.commission.cents(),
            created_by: principal.id.clone(),
            return_status: None,
            refund_amount_cents: 0,
            returns: Vec::new(),
            exchanges: Vec::new(),
            exchange_from: None,
            created_at: now,
            updated_at: now,
        };
        apply_totals(&mut bill, &totals);

        BillRepository::insert(&mut *tx, &bill)
            .await
            .map_err(|e| lift_duplicate(e, &bill.bill_number))?;
        tx.commit().await?;

        info!(
            bill_number = %bill.bill_number,
            lines = bill.lines.len(),
            total = %totals.total,
            created_by = %principal.username,
            "Bill created"
        );
        Ok(bill)
    }

    /// Preview of the next regular bill number.
    pub async fn next_bill_number(&self) -> WorkflowResult<String> {
        Ok(self.db.bills().peek_next_number().await?)
    }

    pub async fn get_bill(&self, id: &str) -> WorkflowResult<Bill> {
        self.db
            .bills()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::BillNotFound(id.to_string()).into())
    }

    pub async fn get_by_number(&self, bill_number: &str) -> WorkflowResult<Bill> {
        self.db
            .bills()
            .get_by_number(bill_number)
            .await?
            .ok_or_else(|| CoreError::BillNotFound(bill_number.trim().to_string()).into())
    }

    /// Applies a patch and recomputes totals from the stored lines.
    pub async fn update_bill(&self, id: &str, patch: BillPatch) -> WorkflowResult<Bill> {
        if patch.bill_number.is_some() {
            return Err(CoreError::ImmutableField("billNumber".to_string()).into());
        }
        if patch.bill_date.is_some() {
            return Err(CoreError::ImmutableField("billDate".to_string()).into());
        }

        let mut bill = self.get_bill(id).await?;

        if let Some(name) = patch.customer_name.as_deref() {
            bill.customer_name = validate_customer_name(name)?;
        }
        if let Some(phone) = patch.customer_phone.as_deref() {
            bill.customer_phone = normalize_optional(Some(phone));
        }
        if let Some(email) = patch.customer_email.as_deref() {
            bill.customer_email = normalize_email(Some(email));
        }

        if patch.payment_status.is_some() || patch.payment_method.is_some() {
            let status = match patch.payment_status.as_deref() {
                Some(raw) => parse_payment_status(Some(raw))?,
                None => bill.payment_status,
            };
            let method = patch
                .payment_method
                .as_deref()
                .or_else(|| bill.payment_method.is_tender().then(|| bill.payment_method.as_str()));
            bill.payment_method = resolve_payment_method(status, method)?;
            bill.payment_status = status;
        }

        if let Some(discount) = patch.discount {
            validate_percentage("discount", discount)?;
            bill.discount_bps = discount.bps();
        }
        if let Some(tax) = patch.tax {
            validate_percentage("tax", tax)?;
            bill.tax_bps = tax.bps();
        }
        if let Some(paid) = patch.amount_paid {
            validate_non_negative("amountPaid", paid)?;
            bill.amount_paid_cents = paid.cents();
        }
        if let Some(agent) = patch.agent_name.as_deref() {
            bill.agent_name = normalize_optional(Some(agent));
        }
        if let Some(commission) = patch.commission {
            validate_non_negative("commission", commission)?;
            bill.commission_cents = commission.cents();
        }

        let totals = BillTotals::from_lines(
            &bill.lines,
            Percentage::from_bps(bill.discount_bps),
            Percentage::from_bps(bill.tax_bps),
            Money::from_cents(bill.amount_paid_cents),
        );
        apply_totals(&mut bill, &totals);

        let now = Utc::now();
        bill.bill_time = bill_time(now);
        bill.updated_at = now;

        self.db.bills().update_header(&bill).await?;
        info!(bill_number = %bill.bill_number, "Bill updated");
        Ok(bill)
    }

    /// Deletes a bill. Stock is not restored.
    pub async fn delete_bill(&self, id: &str) -> WorkflowResult<()> {
        match self.db.bills().delete(id).await {
            Ok(()) => {
                info!(id = %id, "Bill deleted");
                Ok(())
            }
            Err(DbError::NotFound { .. }) => Err(CoreError::BillNotFound(id.to_string()).into()),
            Err(err) => Err(err.into()),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn list(&self, filter: &BillFilter) -> WorkflowResult<BillPage> {
        Ok(self.db.bills().list(filter).await?)
    }

    pub async fn list_all(&self, scope: &BillScope, search: Option<&str>) -> WorkflowResult<Vec<Bill>> {
        let search = search.map(validate_search_query).transpose()?;
        Ok(self.db.bills().list_all(scope, search.as_deref()).await?)
    }

    /// Bills with a status given as clients send it (`"paid"`, `"UNPAID"`).
    pub async fn bills_by_status(
        &self,
        scope: &BillScope,
        raw_status: Option<&str>,
    ) -> WorkflowResult<Vec<Bill>> {
        let raw = raw_status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::required("status"))?;
        let status = parse_payment_status(Some(raw))?;
        Ok(self.db.bills().by_status(scope, status).await?)
    }

    pub async fn suggestions(&self, scope: &BillScope, query: &str) -> WorkflowResult<Vec<String>> {
        let query = validate_search_query(query)?;
        Ok(self
            .db
            .bills()
            .suggestions(scope, &query, SUGGESTION_LIMIT)
            .await?)
    }

    pub async fn exchanged_bills(&self, scope: &BillScope) -> WorkflowResult<Vec<Bill>> {
        Ok(self.db.bills().exchanged(scope).await?)
    }

    pub async fn bills_for_agent(&self, agent_name: &str) -> WorkflowResult<Vec<Bill>> {
        Ok(self.db.bills().for_agent(agent_name).await?)
    }

    /// Clears the agent and commission from every bill of `agent_name`.
    pub async fn delete_agent_commission(&self, agent_name: &str) -> WorkflowResult<u64> {
        let cleared = self.db.bills().clear_agent(agent_name).await?;
        if cleared == 0 {
            return Err(DbError::not_found("Agent bills", agent_name.trim()).into());
        }

        info!(agent = %agent_name.trim(), bills = cleared, "Agent commission removed");
        Ok(cleared)
    }
}

/// Takes numbers from the sequence until one is free.
async fn allocate_number(conn: &mut SqliteConnection) -> WorkflowResult<String> {
    let mut last = String::new();
    for attempt in 1..=NUMBER_ATTEMPTS {
        let candidate = format_bill_number(BillRepository::next_sequence(conn).await?);
        if !BillRepository::number_taken(conn, &candidate).await? {
            return Ok(candidate);
        }
        warn!(attempt, bill_number = %candidate, "Bill number already taken");
        last = candidate;
    }
    Err(CoreError::DuplicateBillNumber(last).into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::test_support::{insert_item, principal, test_db};
    use billbook_core::{PaymentMethod, Role};

    fn line(item_id: &str, quantity: i64) -> LineRequest {
        LineRequest {
            item_id: Some(item_id.to_string()),
            quantity,
            ..Default::default()
        }
    }

    fn sale(lines: Vec<LineRequest>) -> NewBill {
        NewBill {
            customer_name: "Asha".to_string(),
            lines,
            ..Default::default()
        }
    }

    async fn count_bill_rows(db: &Database) -> (i64, i64) {
        let bills: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bill_lines")
            .fetch_one(db.pool())
            .await
            .unwrap();
        (bills, lines)
    }

    #[tokio::test]
    async fn test_simple_sale() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 5000, 10).await;
        let engine = BillingEngine::new(db.clone());

        let mut request = sale(vec![line(&rice.id, 2)]);
        request.payment_status = Some("paid".to_string());
        let bill = engine.create_bill(&editor, request).await.unwrap();

        assert_eq!(bill.bill_number, "BILL-0001");
        assert_eq!(bill.payment_status, PaymentStatus::Paid);
        assert_eq!(bill.payment_method, PaymentMethod::Cash);
        assert_eq!(bill.total_amount_cents, 10000);
        assert_eq!(bill.lines[0].item_name, "rice");
        assert_eq!(bill.lines[0].cost_price_cents, 2500);
        assert_eq!(bill.created_by, editor.id);
        assert_eq!(db.ledger().stock_of(&rice.id).await.unwrap(), 8);

        let stored = engine.get_by_number("BILL-0001").await.unwrap();
        assert_eq!(stored.id, bill.id);
        assert_eq!(stored.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_bill_numbers_strictly_increase() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 100).await;
        let engine = BillingEngine::new(db.clone());

        let mut numbers = Vec::new();
        for _ in 0..3 {
            let bill = engine.create_bill(&editor, sale(vec![line(&rice.id, 1)])).await.unwrap();
            numbers.push(bill.bill_number);
        }

        assert_eq!(numbers, vec!["BILL-0001", "BILL-0002", "BILL-0003"]);
        assert_eq!(engine.next_bill_number().await.unwrap(), "BILL-0004");
    }

    #[tokio::test]
    async fn test_concurrent_bills_get_distinct_numbers() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 100).await;
        let engine = BillingEngine::new(db.clone());

        let mut handles = Vec::new();
        for _ in 0..6 {
            let engine = engine.clone();
            let editor = editor.clone();
            let request = sale(vec![line(&rice.id, 1)]);
            handles.push(tokio::spawn(async move { engine.create_bill(&editor, request).await }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().bill_number);
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 6);
        assert_eq!(db.ledger().stock_of(&rice.id).await.unwrap(), 94);
    }

    #[tokio::test]
    async fn test_taken_number_is_skipped() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let engine = BillingEngine::new(db.clone());

        engine.create_bill(&editor, sale(vec![line(&rice.id, 1)])).await.unwrap();
        sqlx::query("UPDATE bill_sequence SET value = 0 WHERE name = 'bill'")
            .execute(db.pool())
            .await
            .unwrap();

        let bill = engine.create_bill(&editor, sale(vec![line(&rice.id, 1)])).await.unwrap();
        assert_eq!(bill.bill_number, "BILL-0002");
    }

    #[tokio::test]
    async fn test_totals_with_discount_and_tax() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let tv = insert_item(&db, "Television", 100_000, 2).await;
        let engine = BillingEngine::new(db.clone());

        let mut request = sale(vec![line(&tv.id, 1)]);
        request.discount = Percentage::from_bps(1000);
        request.tax = Percentage::from_bps(500);
        let bill = engine.create_bill(&editor, request).await.unwrap();

        assert_eq!(bill.sub_total_cents, 100_000);
        assert_eq!(bill.discount_amount_cents, 10_000);
        assert_eq!(bill.tax_amount_cents, 4_500);
        assert_eq!(bill.total_amount_cents, 94_500);
        assert_eq!(bill.balance_due_cents, 94_500);
    }

    #[tokio::test]
    async fn test_sale_price_override_and_lookup_by_name() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 5000, 10).await;
        let engine = BillingEngine::new(db.clone());

        let request = sale(vec![LineRequest {
            item_name: Some("RICE".to_string()),
            quantity: 1,
            sale_price: Some(Money::from_cents(4500)),
            ..Default::default()
        }]);
        let bill = engine.create_bill(&editor, request).await.unwrap();

        assert_eq!(bill.lines[0].item_id.as_deref(), Some(rice.id.as_str()));
        assert_eq!(bill.lines[0].sale_price_cents, 4500);
        assert_eq!(bill.total_amount_cents, 4500);
    }

    #[tokio::test]
    async fn test_payment_method_rules() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let engine = BillingEngine::new(db.clone());

        let mut unpaid = sale(vec![line(&rice.id, 1)]);
        unpaid.payment_status = Some("UNPAID".to_string());
        unpaid.payment_method = Some("Card".to_string());
        let bill = engine.create_bill(&editor, unpaid).await.unwrap();
        assert_eq!(bill.payment_status, PaymentStatus::Unpaid);
        assert_eq!(bill.payment_method, PaymentMethod::NotApplicable);

        let mut upi = sale(vec![line(&rice.id, 1)]);
        upi.payment_status = Some("Paid".to_string());
        upi.payment_method = Some("upi".to_string());
        let bill = engine.create_bill(&editor, upi).await.unwrap();
        assert_eq!(bill.payment_method, PaymentMethod::Upi);
        assert!(bill.payment_is_consistent());

        let mut cheque = sale(vec![line(&rice.id, 1)]);
        cheque.payment_status = Some("Paid".to_string());
        cheque.payment_method = Some("Cheque".to_string());
        assert!(matches!(
            engine.create_bill(&editor, cheque).await,
            Err(WorkflowError::Rejected(CoreError::InvalidPaymentMethod(_)))
        ));

        let mut bogus = sale(vec![line(&rice.id, 1)]);
        bogus.payment_status = Some("settled".to_string());
        assert!(matches!(
            engine.create_bill(&editor, bogus).await,
            Err(WorkflowError::Rejected(CoreError::InvalidPaymentStatus(s))) if s == "Settled"
        ));

        assert_eq!(db.ledger().stock_of(&rice.id).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let dal = insert_item(&db, "Dal", 100, 3).await;
        let engine = BillingEngine::new(db.clone());

        let err = engine
            .create_bill(&editor, sale(vec![line(&rice.id, 2), line(&dal.id, 5)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Rejected(CoreError::InsufficientStock { available: 3, requested: 5, .. })
        ));
        assert_eq!(count_bill_rows(&db).await, (0, 0));
        assert_eq!(db.ledger().stock_of(&rice.id).await.unwrap(), 10);
        assert_eq!(db.ledger().stock_of(&dal.id).await.unwrap(), 3);
        assert_eq!(engine.next_bill_number().await.unwrap(), "BILL-0001");
    }

    #[tokio::test]
    async fn test_unknown_item_writes_nothing() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let engine = BillingEngine::new(db.clone());

        let request = sale(vec![
            line(&rice.id, 1),
            LineRequest {
                item_name: Some("Ghee".to_string()),
                quantity: 1,
                ..Default::default()
            },
        ]);
        assert!(matches!(
            engine.create_bill(&editor, request).await,
            Err(WorkflowError::Rejected(CoreError::ItemNotFound(name))) if name == "Ghee"
        ));
        assert_eq!(count_bill_rows(&db).await, (0, 0));
        assert_eq!(db.ledger().stock_of(&rice.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let engine = BillingEngine::new(db.clone());

        let mut nameless = sale(vec![line(&rice.id, 1)]);
        nameless.customer_name = "  ".to_string();
        assert!(engine.create_bill(&editor, nameless).await.is_err());

        assert!(engine.create_bill(&editor, sale(vec![])).await.is_err());
        assert!(engine.create_bill(&editor, sale(vec![line(&rice.id, 1000)])).await.is_err());

        let mut discount = sale(vec![line(&rice.id, 1)]);
        discount.discount = Percentage::from_bps(10_001);
        assert!(engine.create_bill(&editor, discount).await.is_err());

        let mut paid = sale(vec![line(&rice.id, 1)]);
        paid.amount_paid = Money::from_cents(-1);
        assert!(engine.create_bill(&editor, paid).await.is_err());

        assert_eq!(count_bill_rows(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_amounts_that_would_overflow_totals_are_rejected() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let engine = BillingEngine::new(db.clone());

        let request = sale(vec![LineRequest {
            item_id: Some(rice.id.clone()),
            quantity: 2,
            sale_price: Some(Money::from_cents(4_700_000_000_000_000_000)),
            ..Default::default()
        }]);
        assert!(matches!(
            engine.create_bill(&editor, request).await,
            Err(WorkflowError::Rejected(CoreError::Validation(_)))
        ));

        let mut paid = sale(vec![line(&rice.id, 1)]);
        paid.amount_paid = Money::from_cents(i64::MAX);
        assert!(engine.create_bill(&editor, paid).await.is_err());

        let crowded = sale((0..=billbook_core::MAX_BILL_LINES).map(|_| line(&rice.id, 1)).collect());
        assert!(engine.create_bill(&editor, crowded).await.is_err());

        assert_eq!(count_bill_rows(&db).await, (0, 0));
        assert_eq!(db.ledger().stock_of(&rice.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_update_recomputes_totals() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let tv = insert_item(&db, "Television", 100_000, 2).await;
        let engine = BillingEngine::new(db.clone());
        let bill = engine.create_bill(&editor, sale(vec![line(&tv.id, 1)])).await.unwrap();

        let patch = BillPatch {
            discount: Some(Percentage::from_bps(1000)),
            tax: Some(Percentage::from_bps(500)),
            amount_paid: Some(Money::from_cents(50_000)),
            payment_status: Some("pending".to_string()),
            ..Default::default()
        };
        let updated = engine.update_bill(&bill.id, patch).await.unwrap();

        assert_eq!(updated.total_amount_cents, 94_500);
        assert_eq!(updated.balance_due_cents, 44_500);
        assert_eq!(updated.payment_status, PaymentStatus::Pending);
        assert_eq!(updated.payment_method, PaymentMethod::NotApplicable);

        let stored = engine.get_bill(&bill.id).await.unwrap();
        assert_eq!(stored.total_amount_cents, 94_500);
        assert_eq!(stored.bill_number, bill.bill_number);

        let paid = BillPatch {
            payment_status: Some("Paid".to_string()),
            ..Default::default()
        };
        let updated = engine.update_bill(&bill.id, paid).await.unwrap();
        assert_eq!(updated.payment_method, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_update_rejects_immutable_fields() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let engine = BillingEngine::new(db.clone());
        let bill = engine.create_bill(&editor, sale(vec![line(&rice.id, 1)])).await.unwrap();

        let patch = BillPatch {
            bill_number: Some("BILL-9999".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            engine.update_bill(&bill.id, patch).await,
            Err(WorkflowError::Rejected(CoreError::ImmutableField(f))) if f == "billNumber"
        ));

        assert!(matches!(
            engine.update_bill("missing", BillPatch::default()).await,
            Err(WorkflowError::Rejected(CoreError::BillNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_keeps_stock() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let engine = BillingEngine::new(db.clone());
        let bill = engine.create_bill(&editor, sale(vec![line(&rice.id, 4)])).await.unwrap();

        engine.delete_bill(&bill.id).await.unwrap();
        assert_eq!(count_bill_rows(&db).await, (0, 0));
        assert_eq!(db.ledger().stock_of(&rice.id).await.unwrap(), 6);

        assert!(matches!(
            engine.delete_bill(&bill.id).await,
            Err(WorkflowError::Rejected(CoreError::BillNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_agent_commission_removal() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 10).await;
        let engine = BillingEngine::new(db.clone());

        for _ in 0..2 {
            let mut request = sale(vec![line(&rice.id, 1)]);
            request.agent_name = Some("Ravi".to_string());
            request.commission = Money::from_cents(500);
            engine.create_bill(&editor, request).await.unwrap();
        }

        assert_eq!(engine.bills_for_agent("Ravi").await.unwrap().len(), 2);
        assert_eq!(engine.delete_agent_commission("Ravi").await.unwrap(), 2);
        assert!(engine.bills_for_agent("Ravi").await.unwrap().is_empty());
        assert!(matches!(
            engine.delete_agent_commission("Ravi").await,
            Err(WorkflowError::Storage(DbError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_listing_scope_search_and_status() {
        let db = test_db().await;
        let first = principal(&db, "first", Role::Editor).await;
        let second = principal(&db, "second", Role::Editor).await;
        let rice = insert_item(&db, "Rice", 100, 50).await;
        let engine = BillingEngine::new(db.clone());

        for i in 0..6 {
            let mut request = sale(vec![line(&rice.id, 1)]);
            request.customer_name = format!("Customer {i}");
            if i % 2 == 0 {
                request.payment_status = Some("Paid".to_string());
            }
            engine.create_bill(&first, request).await.unwrap();
        }
        engine.create_bill(&second, sale(vec![line(&rice.id, 1)])).await.unwrap();

        let page = engine.list(&BillFilter::new(first.own_scope())).await.unwrap();
        assert_eq!(page.total_bills, 6);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.bills.len(), 5);
        assert_eq!(page.bills[0].customer_name, "Customer 5");

        let mut filter = BillFilter::new(BillScope::All);
        filter.search = Some("customer 3".to_string());
        assert_eq!(engine.list(&filter).await.unwrap().total_bills, 1);

        let paid = engine
            .bills_by_status(&first.own_scope(), Some("PAID"))
            .await
            .unwrap();
        assert_eq!(paid.len(), 3);
        assert!(engine.bills_by_status(&BillScope::All, None).await.is_err());
        assert!(matches!(
            engine.bills_by_status(&BillScope::All, Some("done")).await,
            Err(WorkflowError::Rejected(CoreError::InvalidPaymentStatus(_)))
        ));

        let suggestions = engine.suggestions(&first.own_scope(), "bill-000").await.unwrap();
        assert_eq!(suggestions.len(), 6);
        assert!(suggestions.iter().all(|s| s.contains(" - Customer ")));
    }
}
