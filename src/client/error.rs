use crate::protocol::RpcError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to the weather service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A request was attempted while the service is not running.
    #[error("Cannot {0}: weather service not running")]
    NotRunning(&'static str),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("weather service closed its output")]
    Closed,
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("service error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("Failed to start weather service: {0}")]
    StartFailed(Box<ClientError>),
    #[error("Failed to stop weather service: {0}")]
    StopFailed(Box<ClientError>),
}

impl From<RpcError> for ClientError {
    fn from(error: RpcError) -> Self {
        ClientError::Rpc {
            code: error.code,
            message: error.message,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
