use reqwest::StatusCode;
use sudoku_coop_core::{GridError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// 401 or 403 from the backend. Never retried.
    #[error("not authorised: {0}")]
    Unauthorized(String),

    #[error("request failed with {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed puzzle: {0}")]
    Grid(#[from] GridError),

    #[error("channel closed")]
    ChannelClosed,
}

impl ClientError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    /// Failures worth retrying: connection problems, timeouts and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ClientError::Status { status, .. } => status.is_server_error(),
            ClientError::WebSocket(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
