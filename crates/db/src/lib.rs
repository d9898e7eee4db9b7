//! SQLite persistence for the reconciliation engine: pool setup,
//! embedded migrations, read-side repositories, and the transactional
//! turn writer.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    InMemoryReconciliationStore, ReconciliationStore, RepositoryError, SqlClientRepository,
    SqlConversationRepository, SqlOutboxRepository, SqlPriceBookRepository,
    SqlProposalRepository, SqlReconciliationStore, TurnWriter,
};
