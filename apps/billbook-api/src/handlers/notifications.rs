//! Inbox handlers

use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::dto::MessageResponse;
use crate::error::ApiError;
use crate::AppState;
use billbook_core::{Capability, CoreError, Notification, Principal};
use billbook_db::DbError;

/// The caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    principal.require(Capability::ReadNotifications)?;
    let inbox = state.db.notifications().list_for_user(&principal.id).await?;
    Ok(Json(inbox))
}

/// Marks one of the caller's notifications read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    principal.require(Capability::ReadNotifications)?;
    match state.db.notifications().mark_read(&id, &principal.id).await {
        Ok(()) => Ok(Json(MessageResponse::new("Notification marked as read"))),
        Err(DbError::NotFound { .. }) => Err(CoreError::NotificationNotFound(id).into()),
        Err(err) => Err(err.into()),
    }
}
