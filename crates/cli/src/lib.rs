pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use jardin_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "jardin",
    about = "Jardin operator CLI",
    long_about = "Reconcile assistant replies into the client, service, proposal, and \
                  message records, and inspect what the system has learned.",
    after_help = "Examples:\n  jardin migrate\n  jardin reconcile --file reply.txt\n  jardin prices\n  jardin doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Validate config and database readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply one assistant reply from a file or stdin")]
    Reconcile {
        #[arg(long, help = "Read the reply from this file instead of stdin")]
        file: Option<PathBuf>,
    },
    #[command(about = "List the client roster")]
    Clients,
    #[command(about = "List learned service prices")]
    Prices,
    #[command(about = "List proposals, newest first")]
    Proposals,
    #[command(about = "Inspect and update the pending-message outbox")]
    Outbox {
        #[command(subcommand)]
        action: Option<OutboxCommand>,
    },
}

#[derive(Debug, Subcommand)]
enum OutboxCommand {
    #[command(about = "List pending messages")]
    List,
    #[command(about = "Mark a pending message as delivered")]
    MarkSent {
        #[arg(help = "Message id")]
        id: Uuid,
    },
    #[command(about = "Mark a pending message as failed with a reason")]
    MarkFailed {
        #[arg(help = "Message id")]
        id: Uuid,
        #[arg(long, help = "Why delivery failed")]
        reason: String,
    },
}

fn init_logging() {
    use jardin_core::config::LogFormat::*;
    use tracing::Level;

    // Commands load and validate config themselves; logging falls back to
    // defaults if the config is unusable.
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let result = match config.logging.format {
        Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .json()
            .try_init(),
    };
    let _ = result;
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Reconcile { file } => commands::reconcile::run(file),
        Command::Clients => commands::clients::run(),
        Command::Prices => commands::prices::run(),
        Command::Proposals => commands::proposals::run(),
        Command::Outbox { action } => {
            let action = match action {
                None | Some(OutboxCommand::List) => commands::outbox::OutboxAction::List,
                Some(OutboxCommand::MarkSent { id }) => {
                    commands::outbox::OutboxAction::MarkSent { id }
                }
                Some(OutboxCommand::MarkFailed { id, reason }) => {
                    commands::outbox::OutboxAction::MarkFailed { id, reason }
                }
            };
            commands::outbox::run(action)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
