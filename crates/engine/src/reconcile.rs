//! Turn reconciliation: apply every structured block from one assistant
//! reply to storage, atomically.
//!
//! Failure is handled at two levels. A malformed or unresolvable block is
//! skipped with a warning and the rest of the turn continues. A storage
//! failure aborts the whole turn: the writer is dropped uncommitted and
//! nothing from the reply lands.

use std::collections::HashMap;

use chrono::{Days, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use jardin_core::canonical::CanonicalKey;
use jardin_core::domain::client::{Client, ClientId};
use jardin_core::domain::message::{ClientMessage, MessageChannel};
use jardin_core::domain::price_book::PriceBookEntry;
use jardin_core::domain::proposal::{Proposal, ProposalLine};
use jardin_core::domain::service::ServiceRecord;
use jardin_core::extract::{normalize, scan, strip_blocks, Block, BlockKind, LineItem};
use jardin_core::DomainError;
use jardin_db::repositories::{ReconciliationStore, RepositoryError, TurnWriter};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("turn could not be reconciled: {0}")]
    TurnFailed(#[from] RepositoryError),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClientEntry {
    pub id: ClientId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceEntry {
    pub client: String,
    pub description: String,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProposalEntry {
    pub client: String,
    pub proposal_number: String,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessageEntry {
    pub client: String,
    pub channel: MessageChannel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedBlock {
    pub kind: BlockKind,
    pub reason: String,
}

/// What one reconciled turn changed, suitable for showing to the owner.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub new_clients: Vec<ClientEntry>,
    pub new_services: Vec<ServiceEntry>,
    pub new_proposals: Vec<ProposalEntry>,
    pub new_client_messages: Vec<MessageEntry>,
    pub skipped: Vec<SkippedBlock>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.new_clients.is_empty()
            && self.new_services.is_empty()
            && self.new_proposals.is_empty()
            && self.new_client_messages.is_empty()
            && self.skipped.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReconciledTurn {
    /// The reply with all structured blocks removed, ready to show.
    pub prose: String,
    pub manifest: Manifest,
}

pub struct Reconciler<S> {
    store: S,
    proposal_validity_days: u64,
}

impl<S: ReconciliationStore> Reconciler<S> {
    pub fn new(store: S, proposal_validity_days: u64) -> Self {
        Self { store, proposal_validity_days }
    }

    /// Scan `text` for structured blocks and apply them all in one turn.
    pub async fn reconcile(&self, text: &str) -> Result<ReconciledTurn, ReconcileError> {
        let raw_blocks = scan(text);
        let prose = strip_blocks(text);
        if raw_blocks.is_empty() {
            return Ok(ReconciledTurn { prose, manifest: Manifest::default() });
        }

        let mut writer = self.store.begin_turn().await?;
        let mut manifest = Manifest::default();
        // Clients and price entries created or touched earlier in this same
        // turn, so later blocks see them before anything is committed.
        let mut turn_clients: HashMap<CanonicalKey, Client> = HashMap::new();
        let mut price_cache: HashMap<CanonicalKey, PriceBookEntry> = HashMap::new();
        let today = Utc::now().date_naive();

        for raw in &raw_blocks {
            let block = match normalize(raw) {
                Ok(block) => block,
                Err(error) => {
                    warn!(kind = ?raw.kind, %error, "skipping malformed block");
                    manifest
                        .skipped
                        .push(SkippedBlock { kind: raw.kind, reason: error.to_string() });
                    continue;
                }
            };

            let key = CanonicalKey::new(block.client_reference());
            let existing = match turn_clients.get(&key) {
                Some(client) => Some(client.clone()),
                None => writer.find_client_by_canonical_name(&key).await?,
            };
            let client = match crate::resolver::resolve(&block, existing) {
                Ok(crate::resolver::Resolution::Existing(client)) => client,
                Ok(crate::resolver::Resolution::CreateNew(client)) => {
                    writer.create_client(&client).await?;
                    manifest
                        .new_clients
                        .push(ClientEntry { id: client.id, name: client.name.clone() });
                    client
                }
                Ok(crate::resolver::Resolution::Unknown { name }) => {
                    warn!(kind = ?block.kind(), client = %name, "skipping block for unknown client");
                    manifest.skipped.push(SkippedBlock {
                        kind: block.kind(),
                        reason: format!("unknown client: {name}"),
                    });
                    continue;
                }
                Err(error) => {
                    warn!(kind = ?block.kind(), %error, "skipping unresolvable block");
                    manifest
                        .skipped
                        .push(SkippedBlock { kind: block.kind(), reason: error.to_string() });
                    continue;
                }
            };
            turn_clients.insert(client.canonical_name.clone(), client.clone());

            match block {
                Block::NewClient(_) => {}
                Block::ServiceLogged(fields) => {
                    let built: Result<Vec<ServiceRecord>, DomainError> = fields
                        .items
                        .iter()
                        .map(|item| {
                            ServiceRecord::create(client.id, &item.description, item.price, today)
                        })
                        .collect();
                    let mut records = match built {
                        Ok(records) => records,
                        Err(error) => {
                            warn!(%error, "skipping service block");
                            manifest.skipped.push(SkippedBlock {
                                kind: BlockKind::ServiceLogged,
                                reason: error.to_string(),
                            });
                            continue;
                        }
                    };
                    for record in &mut records {
                        record.notes = fields.notes.clone();
                    }
                    for record in &records {
                        writer.create_service(record).await?;
                        manifest.new_services.push(ServiceEntry {
                            client: client.name.clone(),
                            description: record.description.clone(),
                            price: record.price,
                        });
                    }
                    for item in &fields.items {
                        learn_price(writer.as_mut(), &mut price_cache, item).await?;
                    }
                }
                Block::Proposal(fields) => {
                    let prefix = format!("PROP-{}", Utc::now().format("%Y%m"));
                    let sequence = writer.count_proposals_with_prefix(&prefix).await? + 1;
                    let proposal_number = format!("{prefix}-{sequence:03}");
                    let lines: Vec<ProposalLine> = fields
                        .items
                        .iter()
                        .map(|item| ProposalLine {
                            description: item.description.clone(),
                            price: item.price,
                        })
                        .collect();
                    let valid_until = today
                        .checked_add_days(Days::new(self.proposal_validity_days))
                        .unwrap_or(today);
                    let proposal = match Proposal::draft(
                        client.id,
                        proposal_number,
                        lines,
                        fields.notes.clone(),
                        valid_until,
                    ) {
                        Ok(proposal) => proposal,
                        Err(error) => {
                            warn!(%error, "skipping proposal block");
                            manifest.skipped.push(SkippedBlock {
                                kind: BlockKind::Proposal,
                                reason: error.to_string(),
                            });
                            continue;
                        }
                    };
                    if let Some(stated) = fields.stated_total {
                        if stated != proposal.total {
                            debug!(
                                %stated,
                                computed = %proposal.total,
                                "stated proposal total disagrees with line items; keeping computed"
                            );
                        }
                    }
                    writer.create_proposal(&proposal).await?;
                    manifest.new_proposals.push(ProposalEntry {
                        client: client.name.clone(),
                        proposal_number: proposal.proposal_number.clone(),
                        total: proposal.total,
                    });
                    for item in &fields.items {
                        learn_price(writer.as_mut(), &mut price_cache, item).await?;
                    }
                }
                Block::MessageForClient(fields) => {
                    let message = ClientMessage::outbound(
                        client.id,
                        &fields.content,
                        client.contact_preference,
                    );
                    writer.create_client_message(&message).await?;
                    manifest.new_client_messages.push(MessageEntry {
                        client: client.name.clone(),
                        channel: message.channel,
                    });
                }
            }
        }

        for entry in price_cache.values() {
            writer.upsert_price_entry(entry).await?;
        }
        writer.commit().await?;

        Ok(ReconciledTurn { prose, manifest })
    }
}

/// Fold one observed line item into the turn's price knowledge. The entry
/// stays in the cache until the end of the turn, so repeated observations
/// of the same service type within a turn accumulate.
async fn learn_price(
    writer: &mut dyn TurnWriter,
    cache: &mut HashMap<CanonicalKey, PriceBookEntry>,
    item: &LineItem,
) -> Result<(), ReconcileError> {
    let key = CanonicalKey::new(&item.description);
    if key.is_empty() {
        return Ok(());
    }
    let existing = match cache.remove(&key) {
        Some(entry) => Some(entry),
        None => writer.find_price_entry(&key).await?,
    };
    let entry = match existing {
        Some(mut entry) => match entry.observe(item.price) {
            Ok(()) => entry,
            Err(error) => {
                debug!(service = %item.description, %error, "ignoring price observation");
                entry
            }
        },
        None => match PriceBookEntry::first_observation(&item.description, item.price) {
            Ok(entry) => entry,
            Err(error) => {
                debug!(service = %item.description, %error, "ignoring price observation");
                return Ok(());
            }
        },
    };
    cache.insert(entry.canonical_type.clone(), entry);
    Ok(())
}
