//! Error types for breach-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("No lookup sources configured")]
    NoSources,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}
