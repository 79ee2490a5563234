//! Orchestrator error types

use thiserror::Error;
use tour_core_types::TourError;
use tour_session_store::StoreError;

/// Failures talking to the preference backend
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// Transport failure
    #[error("preference request failed: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("preference backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not decode
    #[error("preference response invalid: {0}")]
    Decode(String),

    /// Client construction failed
    #[error("preference client misconfigured: {0}")]
    Config(String),
}

impl PreferenceError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            PreferenceError::Transport(_) => true,
            PreferenceError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PreferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PreferenceError::Decode(err.to_string())
        } else {
            PreferenceError::Transport(err.to_string())
        }
    }
}

/// Failures reading or writing the continuation record
#[derive(Debug, Error)]
pub enum ContinuationError {
    #[error("continuation store error: {0}")]
    Store(#[from] StoreError),

    #[error("continuation record malformed: {0}")]
    Malformed(String),
}

impl From<PreferenceError> for TourError {
    fn from(err: PreferenceError) -> Self {
        TourError::new(err.to_string())
    }
}

impl From<ContinuationError> for TourError {
    fn from(err: ContinuationError) -> Self {
        TourError::new(err.to_string())
    }
}
