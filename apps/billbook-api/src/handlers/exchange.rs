//! Exchange handler

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::dto::exchange::{ExchangeRequestBody, ExchangeResponse};
use crate::error::ApiError;
use crate::middleware::ApiJson;
use crate::AppState;
use billbook_core::{Capability, Principal};

/// Swaps items on a bill and issues the exchange bill.
///
/// Admins fail the capability check here; the workflow refuses them too.
pub async fn request_exchange(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<ExchangeRequestBody>,
) -> Result<(StatusCode, Json<ExchangeResponse>), ApiError> {
    principal.require(Capability::RequestExchange)?;
    let bill = state.exchange.handle_exchange(&principal, body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ExchangeResponse {
            message: "Exchange completed successfully".to_string(),
            bill: bill.into(),
        }),
    ))
}
