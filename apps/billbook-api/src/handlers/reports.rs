//! Dashboard report handlers
//!
//! Admin-wide figures need `ReadAllReports`; the `/my` variants and the
//! counters read the caller's own scope under `ReadBills`.

use axum::extract::State;
use axum::{Extension, Json};

use crate::dto::report::{
    AgentCommissionResponse, SalesDetailsResponse, SummaryResponse, WeeklySalesResponse,
};
use crate::dto::CountResponse;
use crate::error::ApiError;
use crate::AppState;
use billbook_core::report::{CustomerEntry, RankedEntry, StatusRatio, UniqueCustomers};
use billbook_core::{BillScope, Capability, Principal};

pub async fn summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<SummaryResponse>, ApiError> {
    principal.require(Capability::ReadAllReports)?;
    Ok(Json(state.reports.summary(&BillScope::All).await?.into()))
}

pub async fn my_summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<SummaryResponse>, ApiError> {
    principal.require(Capability::ReadBills)?;
    Ok(Json(state.reports.summary(&principal.own_scope()).await?.into()))
}

pub async fn bill_count(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<CountResponse>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let count = state.reports.bill_count(&principal.bill_scope()).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn status_ratio(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<StatusRatio>, ApiError> {
    principal.require(Capability::ReadBills)?;
    Ok(Json(state.reports.status_ratio(&principal.bill_scope()).await?))
}

pub async fn unique_customers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UniqueCustomers>, ApiError> {
    principal.require(Capability::ReadAllReports)?;
    Ok(Json(state.reports.unique_customers(&BillScope::All).await?))
}

pub async fn customer_directory(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<CustomerEntry>>, ApiError> {
    principal.require(Capability::ReadAllReports)?;
    Ok(Json(state.reports.customer_directory(&BillScope::All).await?))
}

pub async fn top_customers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<RankedEntry>>, ApiError> {
    principal.require(Capability::ReadAllReports)?;
    Ok(Json(state.reports.top_customers(&BillScope::All).await?))
}

pub async fn my_top_customers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<RankedEntry>>, ApiError> {
    principal.require(Capability::ReadBills)?;
    Ok(Json(state.reports.top_customers(&principal.own_scope()).await?))
}

/// Staff ranked by bills created
pub async fn top_staff(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<RankedEntry>>, ApiError> {
    principal.require(Capability::ReadAllReports)?;
    Ok(Json(state.reports.top_staff(&BillScope::All).await?))
}

pub async fn weekly_sales(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<WeeklySalesResponse>, ApiError> {
    principal.require(Capability::ReadAllReports)?;
    Ok(Json(state.reports.weekly_sales(&BillScope::All).await?.into()))
}

pub async fn my_weekly_sales(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<WeeklySalesResponse>, ApiError> {
    principal.require(Capability::ReadBills)?;
    Ok(Json(
        state.reports.weekly_sales(&principal.own_scope()).await?.into(),
    ))
}

pub async fn sales_details(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<SalesDetailsResponse>, ApiError> {
    principal.require(Capability::ReadAllReports)?;
    Ok(Json(state.reports.sales_details(&BillScope::All).await?.into()))
}

pub async fn agent_commissions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<AgentCommissionResponse>>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let agents = state
        .reports
        .agent_commissions(&principal.bill_scope())
        .await?;
    Ok(Json(agents.into_iter().map(Into::into).collect()))
}

pub async fn exchange_bill_count(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<CountResponse>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let count = state
        .reports
        .exchange_bill_count(&principal.bill_scope())
        .await?;
    Ok(Json(CountResponse { count: count as i64 }))
}

pub async fn return_bill_count(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<CountResponse>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let count = state
        .reports
        .return_bill_count(&principal.bill_scope())
        .await?;
    Ok(Json(CountResponse { count: count as i64 }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{json_body, TestApp};
    use billbook_core::{Money, Role};
    use billbook_db::{LineRequest, NewBill, NewItem};

    #[tokio::test]
    async fn test_admin_and_own_scopes() {
        let app = TestApp::new().await;
        let (admin, admin_token) = app.login("admin", Role::Admin).await;
        let (editor, editor_token) = app.login("editor", Role::Editor).await;

        let rice = app
            .state
            .catalog
            .create_item(
                &editor,
                NewItem {
                    name: "rice".to_string(),
                    sale_price: Money::from_major(10),
                    stock: 10,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for (who, customer) in [(&editor, "Asha"), (&editor, "Bilal"), (&admin, "Asha")] {
            let request = NewBill {
                customer_name: customer.to_string(),
                lines: vec![LineRequest {
                    item_id: Some(rice.id.clone()),
                    quantity: 1,
                    ..Default::default()
                }],
                ..Default::default()
            };
            app.state.engine.create_bill(who, request).await.unwrap();
        }

        let response = app
            .send(Method::GET, "/bills/summary", Some(&admin_token), None)
            .await;
        let body = json_body(response).await;
        assert_eq!(body["totalBills"], 3);
        assert_eq!(body["totalPendingBills"], 3);
        assert_eq!(body["totalSales"], json!(30.0));

        let response = app
            .send(Method::GET, "/bills/summary", Some(&editor_token), None)
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .send(Method::GET, "/bills/summary/my", Some(&editor_token), None)
            .await;
        assert_eq!(json_body(response).await["totalBills"], 2);

        let response = app
            .send(Method::GET, "/bills/count", Some(&editor_token), None)
            .await;
        assert_eq!(json_body(response).await["count"], 2);

        let response = app
            .send(Method::GET, "/bills/status-ratio", Some(&admin_token), None)
            .await;
        assert_eq!(
            json_body(response).await,
            json!({ "Paid": 0, "Unpaid": 3, "Pending": 0 })
        );

        let response = app
            .send(Method::GET, "/bills/unique-customers", Some(&admin_token), None)
            .await;
        assert_eq!(json_body(response).await["count"], 2);

        let response = app
            .send(Method::GET, "/bills/top-editors", Some(&admin_token), None)
            .await;
        let staff = json_body(response).await;
        assert_eq!(staff[0]["name"], "editor");
        assert_eq!(staff[0]["billCount"], 2);

        let response = app
            .send(Method::GET, "/bills/weekly-sales/my", Some(&editor_token), None)
            .await;
        assert_eq!(json_body(response).await["totalRevenue"], json!(20.0));

        let response = app
            .send(Method::GET, "/bills/count/return", Some(&editor_token), None)
            .await;
        assert_eq!(json_body(response).await["count"], 0);
    }
}
