use jardin_core::canonical::CanonicalKey;
use jardin_core::domain::client::Client;

use super::rows;
use super::RepositoryError;
use crate::DbPool;

/// Read-side access to the client roster, used by the CLI listings. All
/// writes go through the turn writer.
pub struct SqlClientRepository {
    pool: DbPool,
}

impl SqlClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<Client>, RepositoryError> {
        let records = sqlx::query("SELECT * FROM clients ORDER BY canonical_name")
            .fetch_all(&self.pool)
            .await?;
        records.iter().map(rows::client_from_row).collect()
    }

    pub async fn find_by_canonical_name(
        &self,
        key: &CanonicalKey,
    ) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM clients WHERE canonical_name = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(rows::client_from_row).transpose()
    }
}
