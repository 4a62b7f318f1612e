//! Item DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{decimal, optional_money, optional_percent, rate};
use crate::error::ApiError;
use billbook_core::{Item, Role};
use billbook_db::NewItem;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(default)]
    pub name: String,
    pub cost_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i64,
    pub vendor_name: Option<String>,
    pub category: Option<String>,
    pub commission: Option<Decimal>,
}

impl TryFrom<CreateItemRequest> for NewItem {
    type Error = ApiError;

    fn try_from(body: CreateItemRequest) -> Result<Self, Self::Error> {
        Ok(NewItem {
            name: body.name,
            cost_price: optional_money("costPrice", body.cost_price)?.unwrap_or_default(),
            sale_price: optional_money("salePrice", body.sale_price)?.unwrap_or_default(),
            stock: body.stock,
            vendor_name: body.vendor_name,
            category: body.category,
            commission: optional_percent("commission", body.commission)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    #[serde(alias = "search")]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub stock: i64,
    pub vendor_name: String,
    pub category: String,
    pub commission: Decimal,
    pub owner_id: String,
    pub owner_role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        ItemResponse {
            cost_price: decimal(item.cost_price_cents),
            sale_price: decimal(item.sale_price_cents),
            commission: rate(item.commission_bps),
            id: item.id,
            name: item.name,
            stock: item.stock,
            vendor_name: item.vendor_name,
            category: item.category,
            owner_id: item.owner_id,
            owner_role: item.owner_role,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}
