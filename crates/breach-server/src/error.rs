//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::admission::BusyReason;

/// Failure inside a single source. Never crosses the source boundary: the
/// aggregator turns it into an empty contribution plus a diagnostic.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Server busy: {0}")]
    Busy(BusyReason),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("No lookup sources configured")]
    NoSources,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Shutting down")]
    ShuttingDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<breach_core::Error> for ServerError {
    fn from(err: breach_core::Error) -> Self {
        match err {
            breach_core::Error::NoSources => ServerError::NoSources,
            breach_core::Error::InvalidIdentifier(msg) => ServerError::InvalidQuery(msg),
            breach_core::Error::Io(e) => ServerError::Io(e),
            other => ServerError::Config(other.to_string()),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ServerError::NoSources => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServerError::Busy(reason) => json!({ "error": "busy", "reason": reason.gate() }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
