use jardin_core::canonical::CanonicalKey;
use jardin_core::domain::price_book::PriceBookEntry;

use super::rows;
use super::RepositoryError;
use crate::DbPool;

pub struct SqlPriceBookRepository {
    pool: DbPool,
}

impl SqlPriceBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<PriceBookEntry>, RepositoryError> {
        let records = sqlx::query("SELECT * FROM price_book ORDER BY canonical_type")
            .fetch_all(&self.pool)
            .await?;
        records.iter().map(rows::price_entry_from_row).collect()
    }

    pub async fn find_by_canonical_type(
        &self,
        key: &CanonicalKey,
    ) -> Result<Option<PriceBookEntry>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM price_book WHERE canonical_type = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(rows::price_entry_from_row).transpose()
    }
}
