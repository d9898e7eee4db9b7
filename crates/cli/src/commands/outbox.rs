use serde::Serialize;
use uuid::Uuid;

use jardin_core::config::{AppConfig, LoadOptions};
use jardin_core::domain::message::{MessageChannel, MessageId};
use jardin_db::repositories::SqlOutboxRepository;
use jardin_db::connect;

use crate::commands::{build_runtime, CommandResult};

#[derive(Clone, Debug)]
pub enum OutboxAction {
    List,
    MarkSent { id: Uuid },
    MarkFailed { id: Uuid, reason: String },
}

#[derive(Debug, Serialize)]
struct OutboxRow {
    id: Uuid,
    client_id: Uuid,
    channel: MessageChannel,
    content: String,
    created_at: String,
}

pub fn run(action: OutboxAction) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "outbox",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("outbox") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let outbox = SqlOutboxRepository::new(pool.clone());

        let output = match action {
            OutboxAction::List => {
                let pending = outbox
                    .pending()
                    .await
                    .map_err(|error| ("query", error.to_string(), 5u8))?;
                let rows: Vec<OutboxRow> = pending
                    .into_iter()
                    .map(|message| OutboxRow {
                        id: message.id.0,
                        client_id: message.client_id.0,
                        channel: message.channel,
                        content: message.content,
                        created_at: message.created_at.to_rfc3339(),
                    })
                    .collect();
                serde_json::to_string_pretty(&rows)
                    .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"))
            }
            OutboxAction::MarkSent { id } => {
                outbox
                    .mark_sent(MessageId(id))
                    .await
                    .map_err(|error| ("query", error.to_string(), 5u8))?;
                format!("{{\"status\":\"ok\",\"marked_sent\":\"{id}\"}}")
            }
            OutboxAction::MarkFailed { id, reason } => {
                outbox
                    .mark_failed(MessageId(id), &reason)
                    .await
                    .map_err(|error| ("query", error.to_string(), 5u8))?;
                format!("{{\"status\":\"ok\",\"marked_failed\":\"{id}\"}}")
            }
        };

        pool.close().await;
        Ok::<String, (&'static str, String, u8)>(output)
    });

    match result {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("outbox", error_class, message, exit_code)
        }
    }
}
