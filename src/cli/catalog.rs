use anyhow::Result;
use clap::Args;
use step_catalog::build_catalog;
use tour_core_types::{PageKey, Role};

use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct CatalogArgs {
    /// Page key, e.g. dashboard or event-data
    pub page: PageKey,

    /// Role the catalog is built for
    #[arg(short, long, default_value = "attendee")]
    pub role: Role,
}

pub fn cmd_catalog(args: CatalogArgs, output: OutputFormat) -> Result<()> {
    let catalog = build_catalog(args.page, args.role)?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(catalog.steps())?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(catalog.steps())?),
        OutputFormat::Human => {
            println!("{} for {} ({} steps)", args.page, args.role, catalog.len());
            for (index, step) in catalog.steps().iter().enumerate() {
                let gated = catalog
                    .gates()
                    .gate_for(step.target())
                    .map(|gate| format!(" [gated: {}]", gate.key))
                    .unwrap_or_default();
                let title = step
                    .content()
                    .get("title")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default();
                println!(
                    "  {index:>2}. {:<24} {:<8} {title}{gated}",
                    step.target().label(),
                    format!("{:?}", step.placement()).to_lowercase(),
                );
            }
        }
    }
    Ok(())
}
