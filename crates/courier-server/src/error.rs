//! Server error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Message store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Envelope encoding or decoding failed.
    ///
    /// Indicates a protocol violation by the peer or a bug. Fatal for
    /// that connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport-level failure (bind, accept, stream I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid configuration (bad bind address, unreadable TLS files).
    #[error("config error: {0}")]
    Config(String),
}

impl From<courier_proto::ProtocolError> for ServerError {
    fn from(err: courier_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ServerError::Protocol("bad envelope".to_string());
        assert_eq!(err.to_string(), "protocol error: bad envelope");

        let err = ServerError::Config("bad address".to_string());
        assert_eq!(err.to_string(), "config error: bad address");
    }
}
