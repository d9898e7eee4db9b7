use async_trait::async_trait;
use sqlx::{Row, Sqlite, Transaction};

use jardin_core::canonical::CanonicalKey;
use jardin_core::domain::client::Client;
use jardin_core::domain::message::ClientMessage;
use jardin_core::domain::price_book::PriceBookEntry;
use jardin_core::domain::proposal::Proposal;
use jardin_core::domain::service::ServiceRecord;

use super::rows;
use super::{ReconciliationStore, RepositoryError, TurnWriter};
use crate::DbPool;

/// SQLite-backed turn store. Each turn runs inside one transaction, so a
/// failed write leaves nothing from the turn behind.
pub struct SqlReconciliationStore {
    pool: DbPool,
}

impl SqlReconciliationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReconciliationStore for SqlReconciliationStore {
    async fn begin_turn(&self) -> Result<Box<dyn TurnWriter>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqlTurnWriter { tx }))
    }
}

struct SqlTurnWriter {
    tx: Transaction<'static, Sqlite>,
}

fn map_insert_error(error: sqlx::Error, conflict: &str) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            RepositoryError::Conflict(conflict.to_string())
        }
        _ => RepositoryError::Database(error),
    }
}

#[async_trait]
impl TurnWriter for SqlTurnWriter {
    async fn find_client_by_canonical_name(
        &mut self,
        key: &CanonicalKey,
    ) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM clients WHERE canonical_name = ?")
            .bind(key.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(rows::client_from_row).transpose()
    }

    async fn create_client(&mut self, client: &Client) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO clients (
                 id, name, canonical_name, phone, email, address, language,
                 contact_preference, preferences, maintenance_package, notes,
                 created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(client.id.0.to_string())
        .bind(&client.name)
        .bind(client.canonical_name.as_str())
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.address)
        .bind(client.language.as_str())
        .bind(rows::channel_to_str(client.contact_preference))
        .bind(&client.preferences)
        .bind(&client.maintenance_package)
        .bind(&client.notes)
        .bind(client.created_at.to_rfc3339())
        .bind(client.updated_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(|error| {
            map_insert_error(error, &format!("client {}", client.canonical_name.as_str()))
        })?;
        Ok(())
    }

    async fn create_service(&mut self, service: &ServiceRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO services (
                 id, client_id, description, description_es, price, service_date,
                 invoiced, invoice_number, notes, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(service.id.0.to_string())
        .bind(service.client_id.0.to_string())
        .bind(&service.description)
        .bind(&service.description_es)
        .bind(service.price.to_string())
        .bind(service.service_date.to_string())
        .bind(service.invoiced)
        .bind(&service.invoice_number)
        .bind(&service.notes)
        .bind(service.created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_price_entry(
        &mut self,
        key: &CanonicalKey,
    ) -> Result<Option<PriceBookEntry>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM price_book WHERE canonical_type = ?")
            .bind(key.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(rows::price_entry_from_row).transpose()
    }

    async fn upsert_price_entry(
        &mut self,
        entry: &PriceBookEntry,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO price_book (
                 id, service_type, canonical_type, service_type_es, default_price,
                 times_used, notes, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (canonical_type) DO UPDATE SET
                 service_type = excluded.service_type,
                 service_type_es = excluded.service_type_es,
                 default_price = excluded.default_price,
                 times_used = excluded.times_used,
                 notes = excluded.notes,
                 updated_at = excluded.updated_at",
        )
        .bind(entry.id.0.to_string())
        .bind(&entry.service_type)
        .bind(entry.canonical_type.as_str())
        .bind(&entry.service_type_es)
        .bind(entry.default_price.to_string())
        .bind(i64::from(entry.times_used))
        .bind(&entry.notes)
        .bind(entry.created_at.to_rfc3339())
        .bind(entry.updated_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn count_proposals_with_prefix(
        &mut self,
        prefix: &str,
    ) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM proposals WHERE proposal_number LIKE ?",
        )
        .bind(format!("{prefix}%"))
        .fetch_one(&mut *self.tx)
        .await?;
        let count: i64 = row.try_get("count")?;
        u32::try_from(count).map_err(|_| {
            RepositoryError::Decode(format!("proposal count out of range: {count}"))
        })
    }

    async fn create_proposal(&mut self, proposal: &Proposal) -> Result<(), RepositoryError> {
        let lines_json = serde_json::to_string(&proposal.lines).map_err(|error| {
            RepositoryError::Decode(format!("proposal lines encode: {error}"))
        })?;
        sqlx::query(
            "INSERT INTO proposals (
                 id, client_id, proposal_number, lines_json, subtotal, total,
                 notes, status, valid_until, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(proposal.id.0.to_string())
        .bind(proposal.client_id.0.to_string())
        .bind(&proposal.proposal_number)
        .bind(lines_json)
        .bind(proposal.subtotal.to_string())
        .bind(proposal.total.to_string())
        .bind(&proposal.notes)
        .bind(rows::proposal_status_to_str(proposal.status))
        .bind(proposal.valid_until.to_string())
        .bind(proposal.created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(|error| {
            map_insert_error(error, &format!("proposal {}", proposal.proposal_number))
        })?;
        Ok(())
    }

    async fn create_client_message(
        &mut self,
        message: &ClientMessage,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO client_messages (
                 id, client_id, direction, channel, content, subject, status,
                 error_message, sent_at, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.0.to_string())
        .bind(message.client_id.0.to_string())
        .bind(rows::direction_to_str(message.direction))
        .bind(rows::channel_to_str(message.channel))
        .bind(&message.content)
        .bind(&message.subject)
        .bind(rows::message_status_to_str(message.status))
        .bind(&message.error_message)
        .bind(message.sent_at.map(|sent_at| sent_at.to_rfc3339()))
        .bind(message.created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
