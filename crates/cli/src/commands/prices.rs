use rust_decimal::Decimal;
use serde::Serialize;

use jardin_core::config::{AppConfig, LoadOptions};
use jardin_db::repositories::SqlPriceBookRepository;
use jardin_db::connect;

use crate::commands::{build_runtime, CommandResult};

#[derive(Debug, Serialize)]
struct PriceRow {
    service_type: String,
    default_price: Decimal,
    times_used: u32,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "prices",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("prices") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let entries = SqlPriceBookRepository::new(pool.clone())
            .list_all()
            .await
            .map_err(|error| ("query", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<Vec<PriceRow>, (&'static str, String, u8)>(
            entries
                .into_iter()
                .map(|entry| PriceRow {
                    service_type: entry.service_type,
                    default_price: entry.default_price,
                    times_used: entry.times_used,
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
            CommandResult::failure("prices", error_class, message, exit_code)
        }
    }
}
