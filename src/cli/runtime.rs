use std::path::Path;

use anyhow::{Context, Result};
use tour_policy::{load_policy_with_options, LoadOptions, TourPolicy};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    Ok(())
}

/// Builtin defaults, then the policy file, environment overlays and
/// finally the `--set` pairs.
pub fn load_policy(path: Option<&Path>, overrides: &[String]) -> Result<TourPolicy> {
    let options = LoadOptions {
        paths: path.map(|p| vec![p.to_path_buf()]).unwrap_or_default(),
        include_env: true,
        include_cli_env: true,
        cli_overrides: overrides.to_vec(),
    };
    let policy = load_policy_with_options(&options).context("Failed to load tour policy")?;
    match path {
        Some(path) if path.exists() => {
            info!("Loaded tour policy from: {}", path.display())
        }
        Some(path) => info!("Policy file not found, using defaults: {}", path.display()),
        None => info!("Using builtin tour policy"),
    }
    Ok(policy)
}
