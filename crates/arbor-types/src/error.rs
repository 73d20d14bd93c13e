use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid guid: {0}")]
    InvalidGuid(String),

    #[error("invalid type name: {0:?}")]
    InvalidTypeName(String),

    #[error("invalid asset key: {0}")]
    InvalidAssetKey(String),
}
