use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::message::MessageStatus;
use crate::domain::proposal::ProposalStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("price must be non-negative, got {0}")]
    NegativePrice(Decimal),
    #[error("price observation {0} cannot overwrite a learned price")]
    UnusablePriceObservation(Decimal),
    #[error("proposal requires at least one line item")]
    EmptyProposal,
    #[error("invalid proposal transition from {from:?} to {to:?}")]
    InvalidProposalTransition { from: ProposalStatus, to: ProposalStatus },
    #[error("invalid message transition from {from:?} to {to:?}")]
    InvalidMessageTransition { from: MessageStatus, to: MessageStatus },
    #[error("client name must not be blank")]
    BlankClientName,
}
