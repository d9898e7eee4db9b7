use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::ClientId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Owner,
    Assistant,
}

/// One chat thread between the business owner and the assistant. The
/// engine appends turns; it never reconciles the log itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    pub title: String,
    pub client_id: Option<ClientId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn create(title: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId(Uuid::new_v4()),
            title: title.unwrap_or("Nueva conversacion").to_string(),
            client_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub session_id: SessionId,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(session_id: SessionId, role: TurnRole, content: &str) -> Self {
        Self {
            id: TurnId(Uuid::new_v4()),
            session_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}
