//! Error types for signald-client.

use thiserror::Error;

/// Errors that can occur when interacting with the signald daemon.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting to the daemon socket failed, or a read/write on it did.
    #[error("connection failed: {0}")]
    Connection(#[source] std::io::Error),

    /// The daemon closed the connection mid-read.
    #[error("connection was reset")]
    ConnectionReset,

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The daemon answered a blocking command with an `unexpected_error`
    /// envelope.
    #[error("daemon error: {0}")]
    Protocol(String),

    /// An inbound message event could not be normalized.
    #[error("invalid message envelope: {0}")]
    Envelope(#[source] serde_json::Error),
}

impl ClientError {
    /// True for transport-level failures that invalidate the connection.
    ///
    /// Anything else leaves the connection (and, for the subscription
    /// stream, the stream itself) usable.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::ConnectionReset
        )
    }
}
