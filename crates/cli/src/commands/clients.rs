use serde::Serialize;

use jardin_core::config::{AppConfig, LoadOptions};
use jardin_db::repositories::SqlClientRepository;
use jardin_db::connect;

use crate::commands::{build_runtime, CommandResult};

#[derive(Debug, Serialize)]
struct ClientRow {
    name: String,
    phone: Option<String>,
    email: Option<String>,
    language: &'static str,
    maintenance_package: Option<String>,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "clients",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("clients") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let clients = SqlClientRepository::new(pool.clone())
            .list_all()
            .await
            .map_err(|error| ("query", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<Vec<ClientRow>, (&'static str, String, u8)>(
            clients
                .into_iter()
                .map(|client| ClientRow {
                    name: client.name,
                    phone: client.phone,
                    email: client.email,
                    language: client.language.as_str(),
                    maintenance_package: client.maintenance_package,
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
            CommandResult::failure("clients", error_class, message, exit_code)
        }
    }
}
