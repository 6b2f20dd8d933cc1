use super::{DBClient, StoreError};
use crate::models::{User, UserRole};
use async_trait::async_trait;
use uuid::Uuid;

/// Back-office account operations
#[async_trait]
pub trait UserExt: Send + Sync {
    /// Get single user by ID or email
    /// Returns Option - Some(user) if found, None if not found
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    /// Create a new account; `password` must already be hashed
    async fn save_user(
        &self,
        email: &str,
        name: Option<&str>,
        password: &str,
        role: UserRole,
    ) -> Result<User, StoreError>;

    /// Get total count of all users
    async fn get_user_count(&self) -> Result<i64, StoreError>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(
                "SELECT id, email, name, password, role, created_at, updated_at FROM users WHERE id = $1",
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(
                "SELECT id, email, name, password, role, created_at, updated_at FROM users WHERE email = $1",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn save_user(
        &self,
        email: &str,
        name: Option<&str>,
        password: &str,
        role: UserRole,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, password, role, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
