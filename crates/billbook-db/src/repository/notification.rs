//! # Notification Repository
//!
//! The in-app inbox. Rows are written after the workflow that caused them
//! has committed; a failed write here never undoes a bill, return or
//! exchange.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use billbook_core::{Notification, NotificationKind, Role};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    user_id: String,
    message: String,
    kind: NotificationKind,
    link: Option<String>,
    data: Option<String>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> DbResult<Notification> {
        let data = self
            .data
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| DbError::Corrupt(format!("notification {} data: {}", self.id, e)))?;

        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            message: self.message,
            kind: self.kind,
            link: self.link,
            data,
            read: self.read,
            created_at: self.created_at,
        })
    }
}

/// What to put in someone's inbox.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub message: String,
    pub link: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        NewNotification {
            kind,
            message: message.into(),
            link: None,
            data: None,
        }
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Writes one notification for `user_id`.
    pub async fn notify(&self, user_id: &str, note: &NewNotification) -> DbResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            message: note.message.clone(),
            kind: note.kind,
            link: note.link.clone(),
            data: note.data.clone(),
            read: false,
            created_at: Utc::now(),
        };

        let data = notification
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DbError::Internal(e.to_string()))?;

        debug!(user_id = %user_id, kind = ?note.kind, "Writing notification");

        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, message, kind, link, data, read, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.message)
        .bind(notification.kind)
        .bind(&notification.link)
        .bind(data)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }

    /// Writes the same notification for every Admin. Returns how many.
    pub async fn notify_admins(&self, note: &NewNotification) -> DbResult<usize> {
        let admins: Vec<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE role = ?1 ORDER BY created_at, rowid")
                .bind(Role::Admin)
                .fetch_all(&self.pool)
                .await?;

        for admin_id in &admins {
            self.notify(admin_id, note).await?;
        }
        Ok(admins.len())
    }

    /// Inbox for a user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, message, kind, link, data, read, created_at
            FROM notifications
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    /// Marks a notification read. Only its owner may do so.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }
        Ok(())
    }
}
