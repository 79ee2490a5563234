use crate::model::{ContinuationPolicy, GatePolicy, PreflightPolicy, TourFeatures, TourPolicy};

pub const CONTINUATION_STORAGE_KEY: &str = "tour.continuation";

pub fn default_policy() -> TourPolicy {
    TourPolicy {
        rev: 1,
        preflight: PreflightPolicy {
            budget_ms: 15_000,
            poll_interval_ms: 250,
        },
        gates: GatePolicy {
            poll_interval_ms: 150,
            // 30 x 150ms = 4.5s
            toggle_attempts: 30,
            // 20 x 150ms = 3s
            tab_attempts: 20,
        },
        continuation: ContinuationPolicy {
            validity_window_ms: 10_000,
            storage_key: CONTINUATION_STORAGE_KEY.to_string(),
        },
        features: TourFeatures {
            auto_start: true,
            chain: true,
        },
        provenance: Default::default(),
    }
}
