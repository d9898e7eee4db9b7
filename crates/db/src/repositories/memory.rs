use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jardin_core::canonical::CanonicalKey;
use jardin_core::domain::client::Client;
use jardin_core::domain::message::ClientMessage;
use jardin_core::domain::price_book::PriceBookEntry;
use jardin_core::domain::proposal::Proposal;
use jardin_core::domain::service::ServiceRecord;

use super::{ReconciliationStore, RepositoryError, TurnWriter};

#[derive(Clone, Default)]
struct MemoryState {
    clients: Vec<Client>,
    services: Vec<ServiceRecord>,
    price_book: Vec<PriceBookEntry>,
    proposals: Vec<Proposal>,
    messages: Vec<ClientMessage>,
}

/// In-memory store with the same commit discipline as the SQLite store:
/// writes are staged on the writer and only land on commit, and commit
/// enforces the canonical uniqueness keys. Used by engine tests.
#[derive(Clone, Default)]
pub struct InMemoryReconciliationStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryReconciliationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail after all writes succeeded, to exercise
    /// the caller's all-or-nothing handling.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn clients(&self) -> Vec<Client> {
        self.state.lock().expect("store lock").clients.clone()
    }

    pub fn services(&self) -> Vec<ServiceRecord> {
        self.state.lock().expect("store lock").services.clone()
    }

    pub fn price_entries(&self) -> Vec<PriceBookEntry> {
        self.state.lock().expect("store lock").price_book.clone()
    }

    pub fn proposals(&self) -> Vec<Proposal> {
        self.state.lock().expect("store lock").proposals.clone()
    }

    pub fn messages(&self) -> Vec<ClientMessage> {
        self.state.lock().expect("store lock").messages.clone()
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryReconciliationStore {
    async fn begin_turn(&self) -> Result<Box<dyn TurnWriter>, RepositoryError> {
        Ok(Box::new(MemoryTurnWriter {
            state: Arc::clone(&self.state),
            fail_next_commit: Arc::clone(&self.fail_next_commit),
            staged: MemoryState::default(),
        }))
    }
}

struct MemoryTurnWriter {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
    staged: MemoryState,
}

#[async_trait]
impl TurnWriter for MemoryTurnWriter {
    async fn find_client_by_canonical_name(
        &mut self,
        key: &CanonicalKey,
    ) -> Result<Option<Client>, RepositoryError> {
        if let Some(client) =
            self.staged.clients.iter().find(|client| &client.canonical_name == key)
        {
            return Ok(Some(client.clone()));
        }
        let state = self.state.lock().expect("store lock");
        Ok(state.clients.iter().find(|client| &client.canonical_name == key).cloned())
    }

    async fn create_client(&mut self, client: &Client) -> Result<(), RepositoryError> {
        self.staged.clients.push(client.clone());
        Ok(())
    }

    async fn create_service(&mut self, service: &ServiceRecord) -> Result<(), RepositoryError> {
        self.staged.services.push(service.clone());
        Ok(())
    }

    async fn find_price_entry(
        &mut self,
        key: &CanonicalKey,
    ) -> Result<Option<PriceBookEntry>, RepositoryError> {
        if let Some(entry) =
            self.staged.price_book.iter().find(|entry| &entry.canonical_type == key)
        {
            return Ok(Some(entry.clone()));
        }
        let state = self.state.lock().expect("store lock");
        Ok(state.price_book.iter().find(|entry| &entry.canonical_type == key).cloned())
    }

    async fn upsert_price_entry(
        &mut self,
        entry: &PriceBookEntry,
    ) -> Result<(), RepositoryError> {
        self.staged.price_book.retain(|staged| staged.canonical_type != entry.canonical_type);
        self.staged.price_book.push(entry.clone());
        Ok(())
    }

    async fn count_proposals_with_prefix(
        &mut self,
        prefix: &str,
    ) -> Result<u32, RepositoryError> {
        let state = self.state.lock().expect("store lock");
        let committed = state
            .proposals
            .iter()
            .filter(|proposal| proposal.proposal_number.starts_with(prefix))
            .count();
        let staged = self
            .staged
            .proposals
            .iter()
            .filter(|proposal| proposal.proposal_number.starts_with(prefix))
            .count();
        u32::try_from(committed + staged)
            .map_err(|_| RepositoryError::Decode("proposal count out of range".to_string()))
    }

    async fn create_proposal(&mut self, proposal: &Proposal) -> Result<(), RepositoryError> {
        self.staged.proposals.push(proposal.clone());
        Ok(())
    }

    async fn create_client_message(
        &mut self,
        message: &ClientMessage,
    ) -> Result<(), RepositoryError> {
        self.staged.messages.push(message.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }

        let mut state = self.state.lock().expect("store lock");

        for client in &self.staged.clients {
            let duplicate = state
                .clients
                .iter()
                .any(|existing| existing.canonical_name == client.canonical_name)
                || self
                    .staged
                    .clients
                    .iter()
                    .filter(|staged| staged.canonical_name == client.canonical_name)
                    .count()
                    > 1;
            if duplicate {
                return Err(RepositoryError::Conflict(format!(
                    "client {}",
                    client.canonical_name.as_str()
                )));
            }
        }
        for proposal in &self.staged.proposals {
            if state
                .proposals
                .iter()
                .any(|existing| existing.proposal_number == proposal.proposal_number)
            {
                return Err(RepositoryError::Conflict(format!(
                    "proposal {}",
                    proposal.proposal_number
                )));
            }
        }

        state.clients.extend(self.staged.clients);
        state.services.extend(self.staged.services);
        for entry in self.staged.price_book {
            state.price_book.retain(|existing| existing.canonical_type != entry.canonical_type);
            state.price_book.push(entry);
        }
        state.proposals.extend(self.staged.proposals);
        state.messages.extend(self.staged.messages);
        Ok(())
    }
}
