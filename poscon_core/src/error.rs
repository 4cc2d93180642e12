use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing motor driver")]
    MissingDriver,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
