use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Tour policy file (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub policy: Option<PathBuf>,

    /// Policy override as path=value, applied after file and environment
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub overrides: Vec<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    pub output: super::output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}
