use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("control not found: {0}")]
    ControlNotFound(String),
    #[error("control disabled: {0}")]
    ControlDisabled(String),
}
