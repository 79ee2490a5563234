pub mod app;
pub mod catalog;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod policy;
pub mod replay;
pub mod runtime;

pub use catalog::{cmd_catalog, CatalogArgs};
pub use policy::{cmd_policy, PolicyArgs};
pub use replay::{cmd_replay, ReplayArgs};
