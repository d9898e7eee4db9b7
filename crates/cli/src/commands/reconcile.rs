use std::io::Read;
use std::path::PathBuf;

use serde::Serialize;

use jardin_core::config::{AppConfig, LoadOptions};
use jardin_core::domain::conversation::{ChatSession, ConversationTurn, TurnRole};
use jardin_db::repositories::{SqlConversationRepository, SqlReconciliationStore};
use jardin_db::connect;
use jardin_engine::{Manifest, Reconciler};

use crate::commands::{build_runtime, CommandResult};

#[derive(Debug, Serialize)]
struct ReconcileReport {
    prose: String,
    manifest: Manifest,
}

/// Apply one assistant reply: read it from `file` (or stdin), reconcile
/// it against the database, and append it to the conversation log.
pub fn run(file: Option<PathBuf>) -> CommandResult {
    let text = match read_input(file) {
        Ok(text) => text,
        Err(error) => {
            return CommandResult::failure("reconcile", "io", error.to_string(), 6);
        }
    };
    if text.trim().is_empty() {
        return CommandResult::failure("reconcile", "io", "input is empty", 6);
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "reconcile",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("reconcile") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let engine = Reconciler::new(
            SqlReconciliationStore::new(pool.clone()),
            u64::from(config.business.proposal_validity_days),
        );
        let turn = engine
            .reconcile(&text)
            .await
            .map_err(|error| ("turn_failed", error.to_string(), 7u8))?;

        let conversations = SqlConversationRepository::new(pool.clone());
        let session = match conversations
            .latest_session()
            .await
            .map_err(|error| ("conversation_log", error.to_string(), 5u8))?
        {
            Some(session) => session,
            None => {
                let session = ChatSession::create(None);
                conversations
                    .create_session(&session)
                    .await
                    .map_err(|error| ("conversation_log", error.to_string(), 5u8))?;
                session
            }
        };
        conversations
            .append_turn(&ConversationTurn::new(session.id, TurnRole::Assistant, &text))
            .await
            .map_err(|error| ("conversation_log", error.to_string(), 5u8))?;

        pool.close().await;
        Ok::<ReconcileReport, (&'static str, String, u8)>(ReconcileReport {
            prose: turn.prose,
            manifest: turn.manifest,
        })
    });

    match result {
        Ok(report) => {
            let output = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"));
            CommandResult { exit_code: 0, output }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("reconcile", error_class, message, exit_code)
        }
    }
}

fn read_input(file: Option<PathBuf>) -> std::io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}
