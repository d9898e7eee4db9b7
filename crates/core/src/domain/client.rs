use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical::CanonicalKey;
use crate::domain::message::MessageChannel;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
        }
    }

    /// Lenient parse for conversational values ("es", "español", "spanish").
    /// Unrecognized values fall back to English, the default client language.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "es" | "español" | "espanol" | "spanish" => Self::Spanish,
            _ => Self::English,
        }
    }
}

/// A client of the business. At most one client may exist per canonical
/// name; the persistence layer enforces uniqueness on `canonical_name`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub canonical_name: CanonicalKey,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub language: Language,
    pub contact_preference: MessageChannel,
    pub preferences: Option<String>,
    pub maintenance_package: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn create(name: &str) -> Result<Self, DomainError> {
        let canonical_name = CanonicalKey::new(name);
        if canonical_name.is_empty() {
            return Err(DomainError::BlankClientName);
        }
        let now = Utc::now();
        Ok(Self {
            id: ClientId(Uuid::new_v4()),
            name: name.trim().to_string(),
            canonical_name,
            phone: None,
            email: None,
            address: None,
            language: Language::default(),
            contact_preference: MessageChannel::default(),
            preferences: None,
            maintenance_package: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }
}
