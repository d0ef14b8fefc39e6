//! Client error types.

use std::fmt;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the push bot.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Wire protocol error.
    Protocol(pushbot_protocol::ProtocolError),
    /// Websocket transport failure; fatal for the current connection.
    Transport(String),
    /// REST API error.
    Api(pushbot_api::ApiError),
    /// A routed subscriber failed.
    Handler(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Protocol(err) => write!(f, "protocol error: {}", err),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::Api(err) => write!(f, "API error: {}", err),
            Self::Handler(msg) => write!(f, "handler failed: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(err) => Some(err),
            Self::Api(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<pushbot_protocol::ProtocolError> for ClientError {
    fn from(err: pushbot_protocol::ProtocolError) -> Self {
        Self::Protocol(err)
    }
}

impl From<pushbot_api::ApiError> for ClientError {
    fn from(err: pushbot_api::ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
