use clap::Subcommand;

use super::catalog::CatalogArgs;
use super::policy::PolicyArgs;
use super::replay::ReplayArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Replay a scenario file against the tour engine
    Replay(ReplayArgs),

    /// Print the step catalog for a page and role
    Catalog(CatalogArgs),

    /// Show the effective tour policy
    Policy(PolicyArgs),
}
