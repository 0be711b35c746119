use thiserror::Error;

/// Errors surfaced by the codec core and the AEA container layer.
#[derive(Error, Debug)]
pub enum AtracError {
    #[error("i/o fault: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("bit budget exceeded: {used} bits of {budget}")]
    BitBudgetExceeded { used: usize, budget: usize },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("invalid container: {0}")]
    ContainerFormat(String),
}

pub type AtracResult<T> = std::result::Result<T, AtracError>;
