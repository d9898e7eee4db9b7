use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::ClientId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Outgoing,
    Incoming,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageChannel {
    #[default]
    Sms,
    Email,
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
}

/// A queued message to a client in their language. The engine only ever
/// creates these in `Pending`; delivery and the resulting transitions
/// belong to the messaging collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub id: MessageId,
    pub client_id: ClientId,
    pub direction: MessageDirection,
    pub channel: MessageChannel,
    pub content: String,
    pub subject: Option<String>,
    pub status: MessageStatus,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ClientMessage {
    pub fn outbound(client_id: ClientId, content: &str, channel: MessageChannel) -> Self {
        Self {
            id: MessageId(Uuid::new_v4()),
            client_id,
            direction: MessageDirection::Outgoing,
            channel,
            content: content.trim().to_string(),
            subject: None,
            status: MessageStatus::Pending,
            error_message: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_sent(&mut self) -> Result<(), DomainError> {
        if self.status != MessageStatus::Pending {
            return Err(DomainError::InvalidMessageTransition {
                from: self.status,
                to: MessageStatus::Sent,
            });
        }
        self.status = MessageStatus::Sent;
        self.sent_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error_message: &str) -> Result<(), DomainError> {
        if self.status != MessageStatus::Pending {
            return Err(DomainError::InvalidMessageTransition {
                from: self.status,
                to: MessageStatus::Failed,
            });
        }
        self.status = MessageStatus::Failed;
        self.error_message = Some(error_message.to_string());
        Ok(())
    }
}
