use jardin_core::domain::proposal::Proposal;

use super::rows;
use super::RepositoryError;
use crate::DbPool;

/// Read side of the proposals table, for owner-facing listings. Writes go
/// through the turn writer only.
pub struct SqlProposalRepository {
    pool: DbPool,
}

impl SqlProposalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<Proposal>, RepositoryError> {
        let records = sqlx::query("SELECT * FROM proposals ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        records.iter().map(rows::proposal_from_row).collect()
    }

    pub async fn find_by_number(
        &self,
        proposal_number: &str,
    ) -> Result<Option<Proposal>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM proposals WHERE proposal_number = ?")
            .bind(proposal_number)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(rows::proposal_from_row).transpose()
    }
}
