//! Row-to-domain decoding. SQLite stores ids and money as TEXT, so every
//! repository funnels through these helpers to get one place where a bad
//! row becomes a `RepositoryError::Decode` instead of a panic.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use jardin_core::canonical::CanonicalKey;
use jardin_core::domain::client::{Client, ClientId, Language};
use jardin_core::domain::conversation::{
    ChatSession, ConversationTurn, SessionId, TurnId, TurnRole,
};
use jardin_core::domain::message::{
    ClientMessage, MessageChannel, MessageDirection, MessageId, MessageStatus,
};
use jardin_core::domain::price_book::{PriceBookEntry, PriceEntryId};
use jardin_core::domain::proposal::{Proposal, ProposalId, ProposalLine, ProposalStatus};

use super::RepositoryError;

pub(crate) fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("{field}: invalid uuid {raw:?}: {error}")))
}

pub(crate) fn parse_decimal(raw: &str, field: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw).map_err(|error| {
        RepositoryError::Decode(format!("{field}: invalid decimal {raw:?}: {error}"))
    })
}

fn parse_datetime(raw: &str, field: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("{field}: invalid timestamp {raw:?}: {error}"))
        })
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|error| {
        RepositoryError::Decode(format!("{field}: invalid date {raw:?}: {error}"))
    })
}

fn parse_count(raw: i64, field: &str) -> Result<u32, RepositoryError> {
    u32::try_from(raw)
        .map_err(|_| RepositoryError::Decode(format!("{field}: count out of range: {raw}")))
}

pub(crate) fn channel_to_str(channel: MessageChannel) -> &'static str {
    match channel {
        MessageChannel::Sms => "sms",
        MessageChannel::Email => "email",
        MessageChannel::Both => "both",
    }
}

fn channel_from_str(raw: &str) -> Result<MessageChannel, RepositoryError> {
    match raw {
        "sms" => Ok(MessageChannel::Sms),
        "email" => Ok(MessageChannel::Email),
        "both" => Ok(MessageChannel::Both),
        other => Err(RepositoryError::Decode(format!("unknown message channel {other:?}"))),
    }
}

pub(crate) fn direction_to_str(direction: MessageDirection) -> &'static str {
    match direction {
        MessageDirection::Outgoing => "outgoing",
        MessageDirection::Incoming => "incoming",
    }
}

fn direction_from_str(raw: &str) -> Result<MessageDirection, RepositoryError> {
    match raw {
        "outgoing" => Ok(MessageDirection::Outgoing),
        "incoming" => Ok(MessageDirection::Incoming),
        other => Err(RepositoryError::Decode(format!("unknown message direction {other:?}"))),
    }
}

pub(crate) fn message_status_to_str(status: MessageStatus) -> &'static str {
    match status {
        MessageStatus::Pending => "pending",
        MessageStatus::Sent => "sent",
        MessageStatus::Failed => "failed",
    }
}

fn message_status_from_str(raw: &str) -> Result<MessageStatus, RepositoryError> {
    match raw {
        "pending" => Ok(MessageStatus::Pending),
        "sent" => Ok(MessageStatus::Sent),
        "failed" => Ok(MessageStatus::Failed),
        other => Err(RepositoryError::Decode(format!("unknown message status {other:?}"))),
    }
}

pub(crate) fn proposal_status_to_str(status: ProposalStatus) -> &'static str {
    match status {
        ProposalStatus::Draft => "draft",
        ProposalStatus::Sent => "sent",
        ProposalStatus::Accepted => "accepted",
        ProposalStatus::Rejected => "rejected",
    }
}

fn proposal_status_from_str(raw: &str) -> Result<ProposalStatus, RepositoryError> {
    match raw {
        "draft" => Ok(ProposalStatus::Draft),
        "sent" => Ok(ProposalStatus::Sent),
        "accepted" => Ok(ProposalStatus::Accepted),
        "rejected" => Ok(ProposalStatus::Rejected),
        other => Err(RepositoryError::Decode(format!("unknown proposal status {other:?}"))),
    }
}

pub(crate) fn turn_role_to_str(role: TurnRole) -> &'static str {
    match role {
        TurnRole::Owner => "owner",
        TurnRole::Assistant => "assistant",
    }
}

fn turn_role_from_str(raw: &str) -> Result<TurnRole, RepositoryError> {
    match raw {
        "owner" => Ok(TurnRole::Owner),
        "assistant" => Ok(TurnRole::Assistant),
        other => Err(RepositoryError::Decode(format!("unknown turn role {other:?}"))),
    }
}

pub(crate) fn client_from_row(row: &SqliteRow) -> Result<Client, RepositoryError> {
    Ok(Client {
        id: ClientId(parse_uuid(&row.try_get::<String, _>("id")?, "clients.id")?),
        name: row.try_get("name")?,
        canonical_name: CanonicalKey::new(&row.try_get::<String, _>("canonical_name")?),
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        language: Language::parse_lenient(&row.try_get::<String, _>("language")?),
        contact_preference: channel_from_str(&row.try_get::<String, _>("contact_preference")?)?,
        preferences: row.try_get("preferences")?,
        maintenance_package: row.try_get("maintenance_package")?,
        notes: row.try_get("notes")?,
        created_at: parse_datetime(&row.try_get::<String, _>("created_at")?, "clients.created_at")?,
        updated_at: parse_datetime(&row.try_get::<String, _>("updated_at")?, "clients.updated_at")?,
    })
}

pub(crate) fn price_entry_from_row(row: &SqliteRow) -> Result<PriceBookEntry, RepositoryError> {
    Ok(PriceBookEntry {
        id: PriceEntryId(parse_uuid(&row.try_get::<String, _>("id")?, "price_book.id")?),
        service_type: row.try_get("service_type")?,
        canonical_type: CanonicalKey::new(&row.try_get::<String, _>("canonical_type")?),
        service_type_es: row.try_get("service_type_es")?,
        default_price: parse_decimal(
            &row.try_get::<String, _>("default_price")?,
            "price_book.default_price",
        )?,
        times_used: parse_count(row.try_get("times_used")?, "price_book.times_used")?,
        notes: row.try_get("notes")?,
        created_at: parse_datetime(
            &row.try_get::<String, _>("created_at")?,
            "price_book.created_at",
        )?,
        updated_at: parse_datetime(
            &row.try_get::<String, _>("updated_at")?,
            "price_book.updated_at",
        )?,
    })
}

pub(crate) fn proposal_from_row(row: &SqliteRow) -> Result<Proposal, RepositoryError> {
    let lines: Vec<ProposalLine> =
        serde_json::from_str(&row.try_get::<String, _>("lines_json")?).map_err(|error| {
            RepositoryError::Decode(format!("proposals.lines_json: {error}"))
        })?;
    Ok(Proposal {
        id: ProposalId(parse_uuid(&row.try_get::<String, _>("id")?, "proposals.id")?),
        client_id: ClientId(parse_uuid(
            &row.try_get::<String, _>("client_id")?,
            "proposals.client_id",
        )?),
        proposal_number: row.try_get("proposal_number")?,
        lines,
        subtotal: parse_decimal(&row.try_get::<String, _>("subtotal")?, "proposals.subtotal")?,
        total: parse_decimal(&row.try_get::<String, _>("total")?, "proposals.total")?,
        notes: row.try_get("notes")?,
        status: proposal_status_from_str(&row.try_get::<String, _>("status")?)?,
        valid_until: parse_date(
            &row.try_get::<String, _>("valid_until")?,
            "proposals.valid_until",
        )?,
        created_at: parse_datetime(
            &row.try_get::<String, _>("created_at")?,
            "proposals.created_at",
        )?,
    })
}

pub(crate) fn message_from_row(row: &SqliteRow) -> Result<ClientMessage, RepositoryError> {
    let sent_at = match row.try_get::<Option<String>, _>("sent_at")? {
        Some(raw) => Some(parse_datetime(&raw, "client_messages.sent_at")?),
        None => None,
    };
    Ok(ClientMessage {
        id: MessageId(parse_uuid(&row.try_get::<String, _>("id")?, "client_messages.id")?),
        client_id: ClientId(parse_uuid(
            &row.try_get::<String, _>("client_id")?,
            "client_messages.client_id",
        )?),
        direction: direction_from_str(&row.try_get::<String, _>("direction")?)?,
        channel: channel_from_str(&row.try_get::<String, _>("channel")?)?,
        content: row.try_get("content")?,
        subject: row.try_get("subject")?,
        status: message_status_from_str(&row.try_get::<String, _>("status")?)?,
        error_message: row.try_get("error_message")?,
        sent_at,
        created_at: parse_datetime(
            &row.try_get::<String, _>("created_at")?,
            "client_messages.created_at",
        )?,
    })
}

pub(crate) fn session_from_row(row: &SqliteRow) -> Result<ChatSession, RepositoryError> {
    let client_id = match row.try_get::<Option<String>, _>("client_id")? {
        Some(raw) => Some(ClientId(parse_uuid(&raw, "chat_sessions.client_id")?)),
        None => None,
    };
    Ok(ChatSession {
        id: SessionId(parse_uuid(&row.try_get::<String, _>("id")?, "chat_sessions.id")?),
        title: row.try_get("title")?,
        client_id,
        created_at: parse_datetime(
            &row.try_get::<String, _>("created_at")?,
            "chat_sessions.created_at",
        )?,
        updated_at: parse_datetime(
            &row.try_get::<String, _>("updated_at")?,
            "chat_sessions.updated_at",
        )?,
    })
}

pub(crate) fn conversation_turn_from_row(
    row: &SqliteRow,
) -> Result<ConversationTurn, RepositoryError> {
    Ok(ConversationTurn {
        id: TurnId(parse_uuid(&row.try_get::<String, _>("id")?, "conversation_turns.id")?),
        session_id: SessionId(parse_uuid(
            &row.try_get::<String, _>("session_id")?,
            "conversation_turns.session_id",
        )?),
        role: turn_role_from_str(&row.try_get::<String, _>("role")?)?,
        content: row.try_get("content")?,
        created_at: parse_datetime(
            &row.try_get::<String, _>("created_at")?,
            "conversation_turns.created_at",
        )?,
    })
}
