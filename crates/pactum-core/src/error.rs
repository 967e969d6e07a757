use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContractError>;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("assist backend failure: {0}")]
    Upstream(String),
}

impl From<io::Error> for ContractError {
    fn from(err: io::Error) -> Self {
        ContractError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        ContractError::Storage(err.to_string())
    }
}
