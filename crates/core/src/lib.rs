pub mod canonical;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;

pub use canonical::CanonicalKey;
pub use domain::client::{Client, ClientId, Language};
pub use domain::conversation::{ChatSession, ConversationTurn, SessionId, TurnId, TurnRole};
pub use domain::message::{
    ClientMessage, MessageChannel, MessageDirection, MessageId, MessageStatus,
};
pub use domain::price_book::{PriceBookEntry, PriceEntryId};
pub use domain::proposal::{Proposal, ProposalId, ProposalLine, ProposalStatus};
pub use domain::service::{ServiceId, ServiceRecord};
pub use errors::DomainError;
pub use extract::{normalize, scan, strip_blocks, Block, BlockError, BlockKind, LineItem, RawBlock};
