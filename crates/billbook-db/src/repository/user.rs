//! # User Repository
//!
//! The local user directory. Identity is issued elsewhere; this table lets
//! workflows resolve an actor, find admins to notify, and show usernames
//! in reports.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use billbook_core::{Role, User};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id(&mut conn, id).await
    }

    pub async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, role, created_at FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, role, created_at FROM users WHERE username = ?1",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list_by_role(&self, role: Role) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, role, created_at
            FROM users
            WHERE role = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Inserts a user. A taken username is a unique violation on `users`.
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, username = %user.username, role = %user.role, "Inserting user");

        sqlx::query(
            "INSERT INTO users (id, username, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Creates an Admin with the given name unless some Admin exists.
    ///
    /// Returns the new admin, or `None` when one was already there.
    pub async fn ensure_admin(&self, username: &str, email: &str) -> DbResult<Option<User>> {
        if !self.list_by_role(Role::Admin).await?.is_empty() {
            debug!("Admin already present");
            return Ok(None);
        }

        let admin = User {
            id: Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            role: Role::Admin,
            created_at: Utc::now(),
        };
        self.insert(&admin).await?;

        info!(username = %admin.username, "Default admin created");
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_db;
    use billbook_core::Role;

    #[tokio::test]
    async fn test_ensure_admin_only_once() {
        let db = test_db().await;

        let created = db.users().ensure_admin("admin", "Admin@Shop.test").await.unwrap();
        let admin = created.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.email, "admin@shop.test");

        assert!(db.users().ensure_admin("other", "x@y").await.unwrap().is_none());
        assert_eq!(db.users().list_by_role(Role::Admin).await.unwrap().len(), 1);

        let found = db.users().get_by_username("admin").await.unwrap().unwrap();
        assert_eq!(found.id, admin.id);
    }
}
