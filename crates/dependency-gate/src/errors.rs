//! Error types for dependency resolution

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The control port refused the click
    #[error("activation of {control} failed: {reason}")]
    Activation { control: String, reason: String },

    /// The wait was cancelled by a newer wait or a terminal outcome
    #[error("gate wait cancelled")]
    Cancelled,
}

impl GateError {
    /// Get error severity (0=low, 2=high)
    pub fn severity(&self) -> u8 {
        match self {
            GateError::Activation { .. } => 2,
            GateError::Cancelled => 0,
        }
    }
}
