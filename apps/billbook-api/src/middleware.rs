//! API middleware and extractors.

use axum::body::Body;
use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::{extract_bearer_token, AuthError};
use crate::error::ApiError;
use crate::AppState;
use billbook_core::Principal;

/// `axum::Json` whose rejections answer with the API error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` whose rejections answer with the API error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Authentication middleware
///
/// Verifies the bearer token and stores the [`Principal`] in the request
/// extensions. Nothing behind this layer runs without one.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or(AuthError::MissingToken)?;

    let principal = state.jwt.verify(token).map_err(|e| {
        warn!(error = %e, "Token validation failed");
        e
    })?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Request logging middleware
///
/// One event per request with the caller, status and duration.
pub async fn request_log(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user = request
        .extensions()
        .get::<Principal>()
        .map(|p| p.username.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Utc::now();
    let response = next.run(request).await;
    let duration = Utc::now() - start;

    info!(
        method = %method,
        uri = %uri,
        user = %user,
        status = response.status().as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}
