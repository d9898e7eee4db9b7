pub mod client;
pub mod conversation;
pub mod message;
pub mod price_book;
pub mod proposal;
pub mod service;

pub use client::{Client, ClientId, Language};
pub use conversation::{ChatSession, ConversationTurn, SessionId, TurnId, TurnRole};
pub use message::{ClientMessage, MessageChannel, MessageDirection, MessageId, MessageStatus};
pub use price_book::{PriceBookEntry, PriceEntryId};
pub use proposal::{Proposal, ProposalId, ProposalLine, ProposalStatus};
pub use service::{ServiceId, ServiceRecord};
