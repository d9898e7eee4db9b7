use chrono::Utc;
use jardin_core::domain::message::{ClientMessage, MessageId};

use super::rows;
use super::RepositoryError;
use crate::DbPool;

/// The pending-message outbox. The engine queues messages; a delivery
/// process drains them and records the outcome here.
pub struct SqlOutboxRepository {
    pool: DbPool,
}

impl SqlOutboxRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn pending(&self) -> Result<Vec<ClientMessage>, RepositoryError> {
        let records = sqlx::query(
            "SELECT * FROM client_messages WHERE status = 'pending' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        records.iter().map(rows::message_from_row).collect()
    }

    pub async fn mark_sent(&self, id: MessageId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE client_messages SET status = 'sent', sent_at = ?, error_message = NULL
             WHERE id = ? AND status = 'pending'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: MessageId, error: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE client_messages SET status = 'failed', error_message = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(error)
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
