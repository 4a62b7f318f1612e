//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Billbook                               │
//! │                                                                         │
//! │  Client                      Rust Backend                               │
//! │  ──────                      ────────────                               │
//! │                                                                         │
//! │  POST /bills                                                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler: Result<Json<T>, ApiError>                              │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  WorkflowError::Storage(DbError) ──► 500, details logged ──┐    │  │
//! │  │         │                                                  │    │  │
//! │  │         ▼                                                  ▼    │  │
//! │  │  WorkflowError::Rejected(CoreError) ──► 4xx ──────────► ApiError│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄─── 409 {"error": "INSUFFICIENT_STOCK",                               │
//! │            "message": "Not enough stock for item: rice. ..."}           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use billbook_core::CoreError;
use billbook_db::{DbError, WorkflowError};

/// Error returned from every handler.
///
/// ## Serialization
/// ```json
/// {
///   "error": "NOT_FOUND",
///   "message": "Bill not found: 5f0c..."
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Missing or invalid bearer token (401)
    Unauthorized,

    /// Role lacks the capability (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// A debit would take stock below zero (409)
    InsufficientStock,

    /// Duplicate bill number or item (409)
    Conflict,

    /// Bill or request already went through review (409)
    AlreadyProcessed,

    /// Return/exchange window has closed (409)
    WindowExpired,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock
            | ErrorCode::Conflict
            | ErrorCode::AlreadyProcessed
            | ErrorCode::WindowExpired => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code,
            message: self.message,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ItemNotFound(_)
            | CoreError::BillNotFound(_)
            | CoreError::RequestNotFound(_)
            | CoreError::RecordNotFound(_)
            | CoreError::UserNotFound(_)
            | CoreError::NotificationNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::DuplicateBillNumber(_) | CoreError::DuplicateItem { .. } => {
                ErrorCode::Conflict
            }
            CoreError::AlreadyProcessed(_) => ErrorCode::AlreadyProcessed,
            CoreError::ReturnWindowExpired { .. } => ErrorCode::WindowExpired,
            CoreError::Forbidden(_) => ErrorCode::Forbidden,
            CoreError::InvalidPaymentStatus(_)
            | CoreError::InvalidPaymentMethod(_)
            | CoreError::EmptyProductList
            | CoreError::InvalidId(_)
            | CoreError::NoEligibleRecord(_)
            | CoreError::ImmutableField(_)
            | CoreError::AmbiguousItem(_)
            | CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violation: {}", message);
                ApiError::new(ErrorCode::Conflict, "Constraint violated")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database is busy")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Rejected(core) => core.into(),
            WorkflowError::Storage(db) => db.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(e) => {
                tracing::error!("Token signing failed: {}", e);
                ApiError::internal("Token signing failed")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::ValidationError;

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (CoreError::ItemNotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::insufficient_stock("rice", 3, 5), StatusCode::CONFLICT),
            (CoreError::AlreadyProcessed("Bill BILL-0001".into()), StatusCode::CONFLICT),
            (CoreError::DuplicateBillNumber("BILL-0001".into()), StatusCode::CONFLICT),
            (CoreError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (CoreError::EmptyProductList, StatusCode::BAD_REQUEST),
            (CoreError::ImmutableField("billNumber".into()), StatusCode::BAD_REQUEST),
            (CoreError::AmbiguousItem("rice".into()), StatusCode::BAD_REQUEST),
            (CoreError::NoEligibleRecord("r1".into()), StatusCode::BAD_REQUEST),
            (ValidationError::required("customerName").into(), StatusCode::BAD_REQUEST),
        ];

        for (err, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.code.status(), status, "{}", api.message);
        }
    }

    #[test]
    fn test_storage_errors_are_generic() {
        let api: ApiError = WorkflowError::Storage(DbError::QueryFailed("syntax error near x".into())).into();
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert_eq!(api.message, "Database operation failed");
        assert_eq!(api.code.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        let api: ApiError = AuthError::TokenExpired.into();
        assert_eq!(api.code.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
