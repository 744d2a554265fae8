//! Player host entry point.
//!
//! Loads the configuration, sets up logging and runs one scripted session on
//! a single-threaded runtime.

mod cli;
mod config;
mod logging;
mod session;

use anyhow::Result;
use cli::CliArgs;
use config::AppConfig;
use session::Session;
use tokio::signal;
use tokio::task::LocalSet;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Configuration is loaded before logging so the level can come from it
    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    config.validate().map_err(anyhow::Error::msg)?;

    logging::setup_logging(&config.logging, args.json_logs)?;
    display_banner();

    let local = LocalSet::new();
    if let Err(e) = local.run_until(run(config)).await {
        error!("❌ Session error: {:?}", e);
        return Err(e);
    }

    info!("👋 Player host stopped");
    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    let session = Session::new(&config)?;

    let report = session.start();
    for (name, reason) in &report.faulted {
        warn!("Plugin {} was not attached: {}", name, reason);
    }

    tokio::select! {
        steps = session.run_script() => {
            info!("📜 Script finished after {} events", steps);
        }
        result = signal::ctrl_c() => {
            result?;
            info!("📡 Received Ctrl+C, stopping session");
        }
    }

    session.shutdown();
    Ok(())
}

fn display_banner() {
    info!("▶️  Player Host v{}", env!("CARGO_PKG_VERSION"));
    info!("   event core v{}", player_events::PLAYER_EVENTS_VERSION);
}
