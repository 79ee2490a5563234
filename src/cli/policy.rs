use anyhow::Result;
use clap::{Args, Subcommand};
use tour_policy::{PolicySource, TourPolicy};

use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum PolicyCommand {
    /// Print the effective policy and where each value came from
    Show,
}

const PATHS: [&str; 9] = [
    "preflight.budget_ms",
    "preflight.poll_interval_ms",
    "gates.poll_interval_ms",
    "gates.toggle_attempts",
    "gates.tab_attempts",
    "continuation.validity_window_ms",
    "continuation.storage_key",
    "features.auto_start",
    "features.chain",
];

pub fn cmd_policy(args: PolicyArgs, policy: &TourPolicy, output: OutputFormat) -> Result<()> {
    match args.command {
        PolicyCommand::Show => match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(policy)?),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(policy)?),
            OutputFormat::Human => print_human(policy),
        },
    }
    Ok(())
}

fn print_human(policy: &TourPolicy) {
    println!("Policy Revision: {}", policy.rev);
    println!();
    println!(
        "Pre-flight → budget_ms={}, poll_interval_ms={}",
        policy.preflight.budget_ms, policy.preflight.poll_interval_ms
    );
    println!(
        "Gates → poll_interval_ms={}, toggle_attempts={}, tab_attempts={}",
        policy.gates.poll_interval_ms, policy.gates.toggle_attempts, policy.gates.tab_attempts
    );
    println!(
        "Continuation → validity_window_ms={}, storage_key={}",
        policy.continuation.validity_window_ms, policy.continuation.storage_key
    );
    println!(
        "Features → auto_start={}, chain={}",
        policy.features.auto_start, policy.features.chain
    );

    let overridden: Vec<(&str, PolicySource)> = PATHS
        .iter()
        .filter_map(|path| match policy.source_of(path) {
            Some(PolicySource::Builtin) | None => None,
            Some(source) => Some((*path, source)),
        })
        .collect();
    if !overridden.is_empty() {
        println!();
        println!("Overridden:");
        for (path, source) in overridden {
            println!("  {path} ← {source:?}");
        }
    }
}
