//! Store error types.

use courier_proto::MessageId;
use thiserror::Error;

/// Errors from the persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Referenced message does not exist.
    ///
    /// A stale identifier: the message was deleted between the
    /// client's last view and this operation.
    #[error("message not found: {0}")]
    NotFound(MessageId),

    /// Backend failure (I/O, serialization, connection loss).
    #[error("storage backend failed: {0}")]
    Backend(String),
}
