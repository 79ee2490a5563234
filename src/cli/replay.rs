use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tour_orchestrator::{HttpPreferenceClient, HttpPreferenceConfig, PreferenceService};
use tour_policy::TourPolicy;
use tour_session_store::{FileSessionStore, InMemorySessionStore, SessionStore};
use tracing::info;

use super::output::OutputFormat;
use crate::harness::{replay, ReplayOptions, ReplayReport, Scenario};

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// Scenario file (YAML)
    pub scenario: PathBuf,

    /// Keep session storage in this JSON file across replays
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Forward preference updates to this API base URL
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// Bearer token for the preference API
    #[arg(long, requires = "api_base")]
    pub token: Option<String>,
}

pub async fn cmd_replay(args: ReplayArgs, policy: TourPolicy, output: OutputFormat) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;

    let store: Arc<dyn SessionStore> = match &args.store {
        Some(path) => Arc::new(
            FileSessionStore::open(path)
                .with_context(|| format!("Failed to open session store {}", path.display()))?,
        ),
        None => InMemorySessionStore::new(),
    };

    let upstream = match &args.api_base {
        Some(base) => {
            let mut config = HttpPreferenceConfig::new(base.clone());
            config.bearer_token = args.token.clone();
            info!(api_base = %base, "forwarding preference updates");
            let client = HttpPreferenceClient::new(config)?;
            Some(Arc::new(client) as Arc<dyn PreferenceService>)
        }
        None => None,
    };

    let report = replay(
        &scenario,
        ReplayOptions {
            policy,
            store,
            upstream,
        },
    )
    .await?;
    print_report(&report, output)
}

fn print_report(report: &ReplayReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(report)?),
        OutputFormat::Human => {
            println!("Scenario: {}", report.scenario);
            for page in &report.pages {
                let snapshot = &page.snapshot;
                println!(
                    "  {:<16} phase={:?} cursor={}/{} patched={:?} frames={}",
                    page.page.as_str(),
                    snapshot.phase,
                    snapshot.cursor,
                    snapshot.steps,
                    snapshot.patched,
                    page.frames
                );
                if let Some(decision) = &page.decision {
                    println!("  {:<16} mount={:?}", "", decision);
                }
            }
            let calls: Vec<&str> = report.preference_calls.iter().map(|c| c.name()).collect();
            println!("Preference calls: {}", join_or_none(&calls));
            let pages: Vec<&str> = report.navigations.iter().map(|p| p.as_str()).collect();
            println!("Navigations: {}", join_or_none(&pages));
            println!("Lifecycle events: {}", report.events.len());
        }
    }
    if report.pages.is_empty() {
        bail!("scenario replayed no pages");
    }
    Ok(())
}

fn join_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
