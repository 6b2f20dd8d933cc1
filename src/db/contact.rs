use super::{DBClient, StoreError};
use crate::dtos::MessageFlagsDto;
use crate::intake::ContactSubmission;
use crate::models::ContactMessage;
use async_trait::async_trait;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, kind, name, email, message, company_name, phone, position, \
     is_read, is_archived, created_at";

/// Contact message operations
#[async_trait]
pub trait ContactExt: Send + Sync {
    /// Persist a validated submission; merchant-only columns stay null for
    /// individuals
    async fn save_contact_message(
        &self,
        submission: &ContactSubmission,
    ) -> Result<ContactMessage, StoreError>;

    /// Newest first
    async fn list_contact_messages(&self) -> Result<Vec<ContactMessage>, StoreError>;

    async fn count_contact_messages(&self, unread_only: bool) -> Result<i64, StoreError>;

    async fn update_message_flags(
        &self,
        message_id: Uuid,
        flags: &MessageFlagsDto,
    ) -> Result<ContactMessage, StoreError>;

    async fn delete_contact_message(&self, message_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
impl ContactExt for DBClient {
    async fn save_contact_message(
        &self,
        submission: &ContactSubmission,
    ) -> Result<ContactMessage, StoreError> {
        let message = sqlx::query_as::<_, ContactMessage>(&format!(
            r#"
            INSERT INTO contact_messages (kind, name, email, message, company_name, phone, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(submission.kind())
        .bind(submission.name())
        .bind(submission.email())
        .bind(submission.message())
        .bind(submission.company_name())
        .bind(submission.phone())
        .bind(submission.position())
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn list_contact_messages(&self) -> Result<Vec<ContactMessage>, StoreError> {
        let messages = sqlx::query_as::<_, ContactMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM contact_messages ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn count_contact_messages(&self, unread_only: bool) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contact_messages WHERE NOT $1 OR NOT is_read",
        )
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn update_message_flags(
        &self,
        message_id: Uuid,
        flags: &MessageFlagsDto,
    ) -> Result<ContactMessage, StoreError> {
        // COALESCE keeps the stored flag when the request leaves it out
        let message = sqlx::query_as::<_, ContactMessage>(&format!(
            r#"
            UPDATE contact_messages
            SET is_read = COALESCE($1, is_read), is_archived = COALESCE($2, is_archived)
            WHERE id = $3
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(flags.is_read)
        .bind(flags.is_archived)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        message.ok_or(StoreError::NotFound)
    }

    async fn delete_contact_message(&self, message_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
