//! Protocol error types.

use thiserror::Error;

/// Errors from envelope encoding and decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// CBOR serialization failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// CBOR deserialization failed.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Envelope exceeds the maximum wire size.
    #[error("envelope too large: {size} bytes (max {max})")]
    TooLarge {
        /// Actual encoded size.
        size: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// Length prefix or buffer is truncated.
    #[error("truncated envelope: need {need} bytes, have {have}")]
    Truncated {
        /// Bytes required.
        need: usize,
        /// Bytes available.
        have: usize,
    },
}
