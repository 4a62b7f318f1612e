//! Bill handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::dto::bill::{
    bill_list, AgentClearedResponse, BillPageResponse, BillResponse, CreateBillRequest,
    ListBillsQuery, NextBillNumberResponse, StatusQuery, SuggestionQuery, UpdateBillRequest,
};
use crate::dto::{MessageResponse, SearchQuery};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery};
use crate::AppState;
use billbook_core::billing::parse_payment_status;
use billbook_core::{BillScope, Capability, Principal};
use billbook_db::BillFilter;

/// Largest page a client may ask for.
const MAX_PAGE_LIMIT: u32 = 100;

/// Creates a bill, debiting stock for every line
pub async fn create_bill(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<CreateBillRequest>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    principal.require(Capability::CreateBill)?;
    let bill = state.engine.create_bill(&principal, body.try_into()?).await?;
    Ok((StatusCode::CREATED, Json(bill.into())))
}

/// The caller's bills, paginated. `all=true` widens to every bill for admins.
pub async fn list_bills(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<ListBillsQuery>,
) -> Result<Json<BillPageResponse>, ApiError> {
    principal.require(Capability::ReadBills)?;

    let scope = if query.all {
        principal.bill_scope()
    } else {
        principal.own_scope()
    };
    let mut filter = BillFilter::new(scope);
    filter.search = query.search;
    filter.status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_payment_status(Some(s)))
        .transpose()?;
    if let Some(page) = query.page {
        filter.page = page.max(1);
    }
    if let Some(limit) = query.limit {
        filter.limit = limit.clamp(1, MAX_PAGE_LIMIT);
    }

    let page = state.engine.list(&filter).await?;
    Ok(Json(page.into()))
}

/// Every bill, unpaginated
pub async fn all_bills(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<BillResponse>>, ApiError> {
    principal.require(Capability::ReadAllReports)?;
    let bills = state
        .engine
        .list_all(&BillScope::All, query.search.as_deref())
        .await?;
    Ok(Json(bill_list(bills)))
}

pub async fn next_bill_number(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<NextBillNumberResponse>, ApiError> {
    principal.require(Capability::CreateBill)?;
    let bill_number = state.engine.next_bill_number().await?;
    Ok(Json(NextBillNumberResponse { bill_number }))
}

pub async fn bills_by_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<Vec<BillResponse>>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let bills = state
        .engine
        .bills_by_status(&principal.bill_scope(), query.status.as_deref())
        .await?;
    Ok(Json(bill_list(bills)))
}

pub async fn get_bill(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<BillResponse>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let bill = state.engine.get_bill(&id).await?;
    Ok(Json(bill.into()))
}

pub async fn bill_by_number(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(bill_number): Path<String>,
) -> Result<Json<BillResponse>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let bill = state.engine.get_by_number(&bill_number).await?;
    Ok(Json(bill.into()))
}

/// Patches header fields and recomputes totals from the stored lines
pub async fn update_bill(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateBillRequest>,
) -> Result<Json<BillResponse>, ApiError> {
    principal.require(Capability::UpdateBill)?;
    let bill = state.engine.update_bill(&id, body.try_into()?).await?;
    Ok(Json(bill.into()))
}

/// Deletes a bill. Stock is not restored.
pub async fn delete_bill(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    principal.require(Capability::DeleteBill)?;
    state.engine.delete_bill(&id).await?;
    Ok(Json(MessageResponse::new("Bill deleted successfully")))
}

/// `"BILL-0001 - Customer"` strings for the caller's own bills
pub async fn suggestions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<SuggestionQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let found = state
        .engine
        .suggestions(&principal.own_scope(), query.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(found))
}

pub async fn exchanged_bills(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<BillResponse>>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let bills = state.engine.exchanged_bills(&principal.bill_scope()).await?;
    Ok(Json(bill_list(bills)))
}

pub async fn agent_bills(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(name): Path<String>,
) -> Result<Json<Vec<BillResponse>>, ApiError> {
    principal.require(Capability::ReadBills)?;
    let bills = state.engine.bills_for_agent(&name).await?;
    Ok(Json(bill_list(bills)))
}

/// Clears an agent and their commission from every bill they appear on
pub async fn delete_agent_commission(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(name): Path<String>,
) -> Result<Json<AgentClearedResponse>, ApiError> {
    principal.require(Capability::ManageAgents)?;
    let bills_updated = state.engine.delete_agent_commission(&name).await?;
    Ok(Json(AgentClearedResponse {
        message: format!("Agent commission removed for {}", name.trim()),
        bills_updated,
    }))
}
