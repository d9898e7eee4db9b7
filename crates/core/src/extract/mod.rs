//! Extraction grammar: the tag scanner and the field normalizer.
//!
//! Raw assistant text goes in; typed, validated blocks come out. Nothing in
//! this module touches storage — resolution and persistence happen in the
//! engine crate.

pub mod fields;
pub mod scanner;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::client::Language;

pub use fields::{normalize, BlockError};
pub use scanner::{scan, strip_blocks, BlockKind, RawBlock};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewClientFields {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub language: Option<Language>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageFields {
    pub client_name: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceFields {
    pub client_name: String,
    pub items: Vec<LineItem>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProposalFields {
    pub client_name: String,
    pub items: Vec<LineItem>,
    /// Total as stated in the text. Informational only: the persisted total
    /// is always recomputed from the line items.
    pub stated_total: Option<Decimal>,
    pub notes: Option<String>,
}

/// A structured block in its typed form, one variant per block kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    NewClient(NewClientFields),
    MessageForClient(MessageFields),
    ServiceLogged(ServiceFields),
    Proposal(ProposalFields),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::NewClient(_) => BlockKind::NewClient,
            Self::MessageForClient(_) => BlockKind::MessageForClient,
            Self::ServiceLogged(_) => BlockKind::ServiceLogged,
            Self::Proposal(_) => BlockKind::Proposal,
        }
    }

    /// The client name this block refers to, for resolution. A new-client
    /// block references the client it introduces.
    pub fn client_reference(&self) -> &str {
        match self {
            Self::NewClient(fields) => &fields.name,
            Self::MessageForClient(fields) => &fields.client_name,
            Self::ServiceLogged(fields) => &fields.client_name,
            Self::Proposal(fields) => &fields.client_name,
        }
    }
}
