//! RespiraBot process bootstrap: CLI, config, logging, task wiring.

use clap::{Parser, Subcommand};
use respira_channels::{Channel, TelegramChannel};
use respira_dialog::RecordFinalizer;
use respira_session::SessionMap;
use respira_sheets::{RowAppender, SheetsClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod dispatcher;

use config::RespiraConfig;
use dispatcher::Dispatcher;

#[derive(Parser)]
#[command(name = "respira", about = "RespiraBot — PPE logistics pickup bot")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "respira.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start polling for conversations
    Serve {
        /// Use the production bot token instead of the development one
        #[arg(long)]
        production: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = tokio::fs::read_to_string(&cli.config).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config file '{}': {}",
            cli.config.display(),
            e
        )
    })?;
    let config = RespiraConfig::from_toml(&config_str)?;

    match cli.command {
        Commands::Serve { production } => serve(cli.config, config, production).await,
    }
}

async fn serve(config_path: PathBuf, config: RespiraConfig, production: bool) -> anyhow::Result<()> {
    if production {
        warn!("---      Running the production bot       ---");
    } else {
        warn!("---      Running the development bot      ---");
    }
    info!("  - Configuration: {}", config_path.display());
    info!("  - Spreadsheet: {}", config.sheets.spreadsheet);
    info!("  - Backup spreadsheet: {}", config.sheets.backup_spreadsheet);
    info!("  - Conversation timeout: {}s", config.session.timeout_secs);

    // Transport
    let mut telegram = TelegramChannel::new(config.token(production), config.telegram.turn_buffer);
    let turns = telegram
        .take_turn_receiver()
        .ok_or_else(|| anyhow::anyhow!("Turn receiver already taken"))?;
    let telegram = Arc::new(telegram);

    // Destinations: primary + backup, identical payloads.
    let mut primary = SheetsClient::new(
        "primary",
        &config.sheets.spreadsheet,
        &config.sheets.access_token,
    );
    let mut backup = SheetsClient::new(
        "backup",
        &config.sheets.backup_spreadsheet,
        &config.sheets.access_token,
    );
    if let Some(base_url) = &config.sheets.base_url {
        primary = primary.with_base_url(base_url);
        backup = backup.with_base_url(base_url);
    }
    let finalizer = Arc::new(RecordFinalizer::new(
        vec![
            Arc::new(primary) as Arc<dyn RowAppender>,
            Arc::new(backup) as Arc<dyn RowAppender>,
        ],
        config.sheets.confirmed_sheet.clone(),
        config.sheets.scheduled_sheet.clone(),
    ));

    let sessions = Arc::new(SessionMap::new());
    let dispatcher = Arc::new(Dispatcher::new(
        telegram.clone() as Arc<dyn Channel>,
        sessions,
        finalizer,
        config.messages.clone(),
    ));

    // Inactivity sweeper
    let max_idle = chrono::Duration::seconds(config.session.timeout_secs as i64);
    let sweep_every = std::time::Duration::from_secs(config.session.sweep_interval_secs);
    tokio::spawn(dispatcher.clone().run_sweeper(sweep_every, max_idle));

    // Update poller; reconnects on transient API failures.
    let poller = {
        let telegram = telegram.clone();
        tokio::spawn(async move {
            loop {
                match telegram.poll_updates().await {
                    // Clean exit: the turn receiver was dropped.
                    Ok(()) => break,
                    Err(e) => {
                        error!(error = %e, "Update polling failed; retrying");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
        })
    };

    info!("Waiting for conversations");
    tokio::select! {
        _ = dispatcher.run(turns) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    poller.abort();
    Ok(())
}
