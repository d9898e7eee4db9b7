use async_trait::async_trait;
use thiserror::Error;

use jardin_core::canonical::CanonicalKey;
use jardin_core::domain::client::Client;
use jardin_core::domain::message::ClientMessage;
use jardin_core::domain::price_book::PriceBookEntry;
use jardin_core::domain::proposal::Proposal;
use jardin_core::domain::service::ServiceRecord;

pub mod client;
pub mod conversation;
pub mod memory;
pub mod outbox;
pub mod price_book;
pub mod proposal;
mod rows;
pub mod turn;

pub use client::SqlClientRepository;
pub use conversation::SqlConversationRepository;
pub use memory::InMemoryReconciliationStore;
pub use outbox::SqlOutboxRepository;
pub use price_book::SqlPriceBookRepository;
pub use proposal::SqlProposalRepository;
pub use turn::SqlReconciliationStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("uniqueness conflict: {0}")]
    Conflict(String),
}

/// Write-side store for the reconciliation engine. One turn's writes form
/// one logical unit: everything between `begin_turn` and `commit` either
/// lands together or not at all. Dropping an uncommitted writer rolls the
/// turn back.
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    async fn begin_turn(&self) -> Result<Box<dyn TurnWriter>, RepositoryError>;
}

#[async_trait]
pub trait TurnWriter: Send {
    async fn find_client_by_canonical_name(
        &mut self,
        key: &CanonicalKey,
    ) -> Result<Option<Client>, RepositoryError>;

    async fn create_client(&mut self, client: &Client) -> Result<(), RepositoryError>;

    async fn create_service(&mut self, service: &ServiceRecord) -> Result<(), RepositoryError>;

    async fn find_price_entry(
        &mut self,
        key: &CanonicalKey,
    ) -> Result<Option<PriceBookEntry>, RepositoryError>;

    async fn upsert_price_entry(&mut self, entry: &PriceBookEntry)
        -> Result<(), RepositoryError>;

    async fn count_proposals_with_prefix(&mut self, prefix: &str)
        -> Result<u32, RepositoryError>;

    async fn create_proposal(&mut self, proposal: &Proposal) -> Result<(), RepositoryError>;

    async fn create_client_message(
        &mut self,
        message: &ClientMessage,
    ) -> Result<(), RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}
