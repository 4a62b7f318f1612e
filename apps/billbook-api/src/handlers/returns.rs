//! Return and refund handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::dto::returns::{
    BillRefundResponse, RefundResponse, ReturnRequestResponse, SubmitReturnRequest,
};
use crate::error::ApiError;
use crate::middleware::ApiJson;
use crate::AppState;
use billbook_core::{Capability, Principal};

/// Opens a return request on a bill
pub async fn submit_return(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<SubmitReturnRequest>,
) -> Result<(StatusCode, Json<ReturnRequestResponse>), ApiError> {
    principal.require(Capability::SubmitReturn)?;
    let products = body.products.into_iter().map(Into::into).collect();
    let request = state
        .returns
        .submit(&principal, &body.bill_id, &body.reason, products)
        .await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// Admins see every request; everyone else sees their own
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<ReturnRequestResponse>>, ApiError> {
    principal.require(Capability::ListReturnRequests)?;
    let requests = state.returns.list_requests(&principal).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

pub async fn approve_request(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ReturnRequestResponse>, ApiError> {
    principal.require(Capability::ResolveReturn)?;
    let request = state.returns.approve(&id).await?;
    Ok(Json(request.into()))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ReturnRequestResponse>, ApiError> {
    principal.require(Capability::ResolveReturn)?;
    let request = state.returns.reject(&id).await?;
    Ok(Json(request.into()))
}

/// Marks one return record's refund as handed out. Repeating it is a no-op.
pub async fn allot_refund(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(return_id): Path<String>,
) -> Result<Json<RefundResponse>, ApiError> {
    principal.require(Capability::AllotRefund)?;
    let outcome = state.returns.allot_refund(&return_id).await?;
    Ok(Json(outcome.into()))
}

/// Allots every approved, unallotted return of a bill
pub async fn refund_bill(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(bill_id): Path<String>,
) -> Result<Json<BillRefundResponse>, ApiError> {
    principal.require(Capability::AllotRefund)?;
    let refund = state.returns.refund_approved_for_bill(&bill_id).await?;
    Ok(Json(refund.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{json_body, TestApp};
    use billbook_core::{Money, Role};
    use billbook_db::{LineRequest, NewBill, NewItem};

    #[tokio::test]
    async fn test_return_approval_and_refund_flow() {
        let app = TestApp::new().await;
        let (_, admin_token) = app.login("admin", Role::Admin).await;
        let (editor, editor_token) = app.login("editor", Role::Editor).await;

        let kurta = app
            .state
            .catalog
            .create_item(
                &editor,
                NewItem {
                    name: "kurta".to_string(),
                    sale_price: Money::from_major(100),
                    stock: 5,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let bill = app
            .state
            .engine
            .create_bill(
                &editor,
                NewBill {
                    customer_name: "Asha".to_string(),
                    lines: vec![LineRequest {
                        item_id: Some(kurta.id.clone()),
                        quantity: 2,
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Empty product list
        let response = app
            .send(
                Method::POST,
                "/returns/submit",
                Some(&editor_token),
                Some(json!({ "billId": bill.id, "reason": "damaged", "products": [] })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(
                Method::POST,
                "/returns/submit",
                Some(&editor_token),
                Some(json!({
                    "billId": bill.id,
                    "reason": "damaged",
                    "products": [{ "itemName": "kurta", "quantity": 1 }]
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let request = json_body(response).await;
        assert_eq!(request["status"], "Pending");
        assert_eq!(request["products"][0]["salePrice"], json!(100.0));
        let request_id = request["id"].as_str().unwrap().to_string();

        // Second submission while pending
        let response = app
            .send(
                Method::POST,
                "/returns/submit",
                Some(&editor_token),
                Some(json!({
                    "billId": bill.id,
                    "reason": "again",
                    "products": [{ "itemName": "kurta", "quantity": 1 }]
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Editors cannot resolve
        let approve = format!("/returns/requests/{}/approve", request_id);
        let response = app.send(Method::POST, &approve, Some(&editor_token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.send(Method::POST, &approve, Some(&admin_token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "Approved");
        assert_eq!(app.state.db.ledger().stock_of(&kurta.id).await.unwrap(), 4);

        let response = app.send(Method::POST, &approve, Some(&admin_token), None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["error"], "ALREADY_PROCESSED");

        let stored = app.state.engine.get_bill(&bill.id).await.unwrap();
        let record_id = stored.returns[0].id.clone();
        let refund = format!("/returns/refund/{}", record_id);

        let response = app.send(Method::PATCH, &refund, Some(&editor_token), None).await;
        let body = json_body(response).await;
        assert_eq!(body["alreadyAllotted"], false);
        assert_eq!(body["refundAmount"], json!(100.0));

        let response = app.send(Method::PATCH, &refund, Some(&editor_token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["alreadyAllotted"], true);

        let response = app
            .send(Method::PATCH, "/returns/refund/not-a-uuid", Some(&editor_token), None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(Method::GET, "/returns/requests", Some(&admin_token), None)
            .await;
        let listed = json_body(response).await;
        assert_eq!(listed[0]["customerName"], "Asha");
        assert_eq!(listed[0]["requesterName"], "editor");
    }

    #[tokio::test]
    async fn test_unknown_request_is_not_found() {
        let app = TestApp::new().await;
        let (_, admin_token) = app.login("admin", Role::Admin).await;

        let response = app
            .send(Method::POST, "/returns/requests/missing/reject", Some(&admin_token), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
