pub mod api;
pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;

pub use api::{fixed_policy, InMemoryPolicyCenter, PolicyCenter};
pub use defaults::default_policy;
pub use errors::PolicyError;
pub use loader::{load_policy, load_policy_with_options, LoadOptions};
pub use model::{
    ContinuationPolicy, GatePolicy, PolicySource, PreflightPolicy, RuntimeOverrideSpec,
    TourFeatures, TourPolicy,
};
