use super::catalog::cmd_catalog;
use super::env::CliArgs;
use super::policy::cmd_policy;
use super::replay::cmd_replay;
use crate::cli::commands::Commands;
use anyhow::Result;
use tour_policy::TourPolicy;

pub async fn dispatch(cli: &CliArgs, policy: TourPolicy) -> Result<()> {
    match cli.command.clone() {
        Commands::Replay(args) => cmd_replay(args, policy, cli.output).await,
        Commands::Catalog(args) => cmd_catalog(args, cli.output),
        Commands::Policy(args) => cmd_policy(args, &policy, cli.output),
    }
}
