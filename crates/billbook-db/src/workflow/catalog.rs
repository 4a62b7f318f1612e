//! Catalog maintenance: adding, listing and removing items.
//!
//! Initial stock is set here; every later change goes through the ledger.

use chrono::Utc;
use tracing::info;

use crate::error::{DbError, WorkflowResult};
use crate::repository::item::generate_item_id;
use crate::Database;
use billbook_core::validation::{
    normalize_item_name, normalize_optional, validate_non_negative, validate_percentage,
    validate_search_query, validate_stock,
};
use billbook_core::{CoreError, Item, Money, Percentage, Principal};

/// Most items one listing returns.
const ITEM_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub name: String,
    pub cost_price: Money,
    pub sale_price: Money,
    pub stock: i64,
    pub vendor_name: Option<String>,
    pub category: Option<String>,
    pub commission: Percentage,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    /// Adds an item owned by `owner`.
    pub async fn create_item(&self, owner: &Principal, request: NewItem) -> WorkflowResult<Item> {
        let name = normalize_item_name(&request.name)?;
        validate_non_negative("costPrice", request.cost_price)?;
        validate_non_negative("salePrice", request.sale_price)?;
        validate_stock(request.stock)?;
        validate_percentage("commission", request.commission)?;

        let now = Utc::now();
        let item = Item {
            id: generate_item_id(),
            name,
            cost_price_cents: request.cost_price.cents(),
            sale_price_cents: request.sale_price.cents(),
            stock: request.stock,
            vendor_name: normalize_optional(request.vendor_name.as_deref()).unwrap_or_default(),
            category: normalize_optional(request.category.as_deref()).unwrap_or_default(),
            commission_bps: request.commission.bps(),
            owner_id: owner.id.clone(),
            owner_role: owner.role,
            created_at: now,
            updated_at: now,
        };

        match self.db.items().insert(&item).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("items") => {
                return Err(CoreError::DuplicateItem {
                    name: item.name,
                    vendor: item.vendor_name,
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        info!(id = %item.id, name = %item.name, stock = item.stock, "Item created");
        Ok(item)
    }

    pub async fn get_item(&self, id: &str) -> WorkflowResult<Item> {
        self.db
            .items()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()).into())
    }

    pub async fn list_items(&self, query: Option<&str>) -> WorkflowResult<Vec<Item>> {
        let query = validate_search_query(query.unwrap_or_default())?;
        Ok(self.db.items().list(&query, ITEM_LIST_LIMIT).await?)
    }

    pub async fn delete_item(&self, id: &str) -> WorkflowResult<()> {
        match self.db.items().delete(id).await {
            Ok(()) => {
                info!(id = %id, "Item deleted");
                Ok(())
            }
            Err(DbError::NotFound { .. }) => Err(CoreError::ItemNotFound(id.to_string()).into()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::test_support::{principal, test_db};
    use billbook_core::Role;

    fn rice() -> NewItem {
        NewItem {
            name: " Basmati Rice ".to_string(),
            cost_price: Money::from_major(60),
            sale_price: Money::from_major(80),
            stock: 25,
            vendor_name: Some("Agro Mills".to_string()),
            category: Some("Grains".to_string()),
            commission: Percentage::from_bps(250),
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let catalog = Catalog::new(db.clone());

        let item = catalog.create_item(&editor, rice()).await.unwrap();
        assert_eq!(item.name, "basmati rice");
        assert_eq!(item.owner_id, editor.id);
        assert_eq!(item.owner_role, Role::Editor);

        let fetched = catalog.get_item(&item.id).await.unwrap();
        assert_eq!(fetched.stock, 25);
        assert_eq!(catalog.list_items(Some("agro")).await.unwrap().len(), 1);
        assert_eq!(catalog.list_items(None).await.unwrap().len(), 1);

        catalog.delete_item(&item.id).await.unwrap();
        assert!(matches!(
            catalog.get_item(&item.id).await,
            Err(WorkflowError::Rejected(CoreError::ItemNotFound(_)))
        ));
        assert!(matches!(
            catalog.delete_item(&item.id).await,
            Err(WorkflowError::Rejected(CoreError::ItemNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_item() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let catalog = Catalog::new(db.clone());

        catalog.create_item(&editor, rice()).await.unwrap();
        let err = catalog.create_item(&editor, rice()).await.unwrap_err();
        match err {
            WorkflowError::Rejected(CoreError::DuplicateItem { name, vendor }) => {
                assert_eq!(name, "basmati rice");
                assert_eq!(vendor, "Agro Mills");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_item() {
        let db = test_db().await;
        let editor = principal(&db, "editor", Role::Editor).await;
        let catalog = Catalog::new(db.clone());

        let mut negative = rice();
        negative.stock = -1;
        assert!(catalog.create_item(&editor, negative).await.is_err());

        let mut nameless = rice();
        nameless.name = "   ".to_string();
        assert!(catalog.create_item(&editor, nameless).await.is_err());
        assert_eq!(db.items().count().await.unwrap(), 0);
    }
}
