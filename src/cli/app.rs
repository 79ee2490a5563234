use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_policy};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.json_logs)?;
    info!("Starting tour-harness v{}", env!("CARGO_PKG_VERSION"));

    let policy = load_policy(cli.policy.as_deref(), &cli.overrides)?;

    match dispatch(&cli, policy).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}
