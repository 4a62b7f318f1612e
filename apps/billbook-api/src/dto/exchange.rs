//! Exchange DTOs

use serde::{Deserialize, Serialize};

use super::bill::BillResponse;
use billbook_db::{ExchangeLineRequest, ExchangeRequest};

/// One swap. The old item may be named by `oldItemName` or `itemName`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeItemInput {
    pub old_item_id: Option<String>,
    #[serde(alias = "itemName")]
    pub old_item_name: Option<String>,
    pub old_quantity: Option<i64>,
    pub new_item_id: Option<String>,
    pub new_item_name: Option<String>,
    #[serde(default = "one")]
    pub quantity: i64,
    pub reason: Option<String>,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequestBody {
    #[serde(default)]
    pub bill_id: String,
    #[serde(default)]
    pub items: Vec<ExchangeItemInput>,
    pub payment_method: Option<String>,
}

impl From<ExchangeRequestBody> for ExchangeRequest {
    fn from(body: ExchangeRequestBody) -> Self {
        ExchangeRequest {
            bill_id: body.bill_id,
            lines: body
                .items
                .into_iter()
                .map(|item| ExchangeLineRequest {
                    old_item_id: item.old_item_id,
                    old_item_name: item.old_item_name,
                    old_quantity: item.old_quantity,
                    new_item_id: item.new_item_id,
                    new_item_name: item.new_item_name,
                    quantity: item.quantity,
                    reason: item.reason,
                })
                .collect(),
            payment_method: body.payment_method,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    pub message: String,
    pub bill: BillResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_name_alias_and_defaults() {
        let body: ExchangeRequestBody = serde_json::from_value(serde_json::json!({
            "billId": "b1",
            "items": [{ "itemName": "kurta", "newItemName": "shirt" }]
        }))
        .unwrap();

        let request = ExchangeRequest::from(body);
        let line = &request.lines[0];
        assert_eq!(line.old_item_name.as_deref(), Some("kurta"));
        assert_eq!(line.old_quantity, None);
        assert_eq!(line.quantity, 1);
    }
}
