use rust_decimal::Decimal;
use serde::Serialize;

use jardin_core::config::{AppConfig, LoadOptions};
use jardin_core::domain::proposal::ProposalStatus;
use jardin_db::repositories::SqlProposalRepository;
use jardin_db::connect;

use crate::commands::{build_runtime, CommandResult};

#[derive(Debug, Serialize)]
struct ProposalRow {
    proposal_number: String,
    client_id: String,
    lines: usize,
    total: Decimal,
    status: ProposalStatus,
    valid_until: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "proposals",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("proposals") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let proposals = SqlProposalRepository::new(pool.clone())
            .list_all()
            .await
            .map_err(|error| ("query", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<Vec<ProposalRow>, (&'static str, String, u8)>(
            proposals
                .into_iter()
                .map(|proposal| ProposalRow {
                    proposal_number: proposal.proposal_number,
                    client_id: proposal.client_id.0.to_string(),
                    lines: proposal.lines.len(),
                    total: proposal.total,
                    status: proposal.status,
                    valid_until: proposal.valid_until.to_string(),
                })
                .collect(),
        )
    });

    match result {
        Ok(rows) => {
            let output = serde_json::to_string_pretty(&rows)
                .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"));
            CommandResult { exit_code: 0, output }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("proposals", error_class, message, exit_code)
        }
    }
}
