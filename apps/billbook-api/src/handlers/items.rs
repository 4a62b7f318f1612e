//! Catalog handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::dto::item::{CreateItemRequest, ItemQuery, ItemResponse};
use crate::dto::MessageResponse;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery};
use crate::AppState;
use billbook_core::{Capability, Principal};

pub async fn create_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    principal.require(Capability::ManageItems)?;
    let item = state.catalog.create_item(&principal, body.try_into()?).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn list_items(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<ItemQuery>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    principal.require(Capability::ManageItems)?;
    let items = state.catalog.list_items(query.q.as_deref()).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

pub async fn get_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    principal.require(Capability::ManageItems)?;
    Ok(Json(state.catalog.get_item(&id).await?.into()))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    principal.require(Capability::ManageItems)?;
    state.catalog.delete_item(&id).await?;
    Ok(Json(MessageResponse::new("Item deleted successfully")))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{json_body, TestApp};
    use billbook_core::Role;

    #[tokio::test]
    async fn test_item_lifecycle() {
        let app = TestApp::new().await;
        let (_, token) = app.login("editor", Role::Editor).await;
        let (_, vendor) = app.login("vendor", Role::Vendor).await;

        let body = json!({
            "name": " Basmati Rice ",
            "costPrice": 60,
            "salePrice": 80.5,
            "stock": 25,
            "vendorName": "Agro Mills",
            "commission": 2.5
        });

        let response = app
            .send(Method::POST, "/items", Some(&vendor), Some(body.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .send(Method::POST, "/items", Some(&token), Some(body.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let item = json_body(response).await;
        assert_eq!(item["name"], "basmati rice");
        assert_eq!(item["salePrice"], json!(80.5));
        assert_eq!(item["commission"], json!(2.5));
        let id = item["id"].as_str().unwrap().to_string();

        let response = app.send(Method::POST, "/items", Some(&token), Some(body)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app.send(Method::GET, "/items?q=agro", Some(&token), None).await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

        let path = format!("/items/{}", id);
        let response = app.send(Method::DELETE, &path, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.send(Method::GET, &path, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
