use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::ClientId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalLine {
    pub description: String,
    pub price: Decimal,
}

/// A priced quote for a client. The total is always the exact cent sum of
/// the line items; it is computed here, never trusted from the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub client_id: ClientId,
    pub proposal_number: String,
    pub lines: Vec<ProposalLine>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub status: ProposalStatus,
    pub valid_until: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn draft(
        client_id: ClientId,
        proposal_number: String,
        lines: Vec<ProposalLine>,
        notes: Option<String>,
        valid_until: NaiveDate,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::EmptyProposal);
        }
        if let Some(line) = lines.iter().find(|line| line.price.is_sign_negative()) {
            return Err(DomainError::NegativePrice(line.price));
        }
        let total = Self::sum_lines(&lines);
        Ok(Self {
            id: ProposalId(Uuid::new_v4()),
            client_id,
            proposal_number,
            lines,
            subtotal: total,
            total,
            notes,
            status: ProposalStatus::Draft,
            valid_until,
            created_at: Utc::now(),
        })
    }

    pub fn sum_lines(lines: &[ProposalLine]) -> Decimal {
        lines.iter().map(|line| line.price).sum::<Decimal>().round_dp(2)
    }

    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        matches!(
            (self.status, next),
            (ProposalStatus::Draft, ProposalStatus::Sent)
                | (ProposalStatus::Sent, ProposalStatus::Accepted)
                | (ProposalStatus::Sent, ProposalStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: ProposalStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }
        Err(DomainError::InvalidProposalTransition { from: self.status, to: next })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{Proposal, ProposalLine, ProposalStatus};
    use crate::domain::client::ClientId;
    use crate::errors::DomainError;

    fn lines() -> Vec<ProposalLine> {
        vec![
            ProposalLine { description: "Tree trimming".to_string(), price: Decimal::new(12000, 2) },
            ProposalLine {
                description: "Sprinkler repair".to_string(),
                price: Decimal::new(2500, 2),
            },
        ]
    }

    fn draft() -> Proposal {
        Proposal::draft(
            ClientId(Uuid::new_v4()),
            "PROP-202501-001".to_string(),
            lines(),
            None,
            Utc::now().date_naive(),
        )
        .expect("draft proposal")
    }

    #[test]
    fn total_is_the_sum_of_lines() {
        let proposal = draft();
        assert_eq!(proposal.total, Decimal::new(14500, 2));
        assert_eq!(proposal.subtotal, proposal.total);
    }

    #[test]
    fn empty_line_list_is_rejected() {
        let error = Proposal::draft(
            ClientId(Uuid::new_v4()),
            "PROP-202501-001".to_string(),
            Vec::new(),
            None,
            Utc::now().date_naive(),
        )
        .expect_err("empty proposal");
        assert_eq!(error, DomainError::EmptyProposal);
    }

    #[test]
    fn allows_draft_sent_accepted_lifecycle() {
        let mut proposal = draft();
        proposal.transition_to(ProposalStatus::Sent).expect("draft -> sent");
        proposal.transition_to(ProposalStatus::Accepted).expect("sent -> accepted");
        assert_eq!(proposal.status, ProposalStatus::Accepted);
    }

    #[test]
    fn blocks_skipping_the_sent_state() {
        let mut proposal = draft();
        let error =
            proposal.transition_to(ProposalStatus::Accepted).expect_err("draft -> accepted");
        assert!(matches!(error, DomainError::InvalidProposalTransition { .. }));
    }
}
