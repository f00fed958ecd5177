//! Wire envelope framing.
//!
//! Every frame on the wire is a 4-byte big-endian length prefix
//! followed by a CBOR-encoded [`Envelope`]. The length covers the CBOR
//! body only. Frames are capped at [`MAX_ENVELOPE_SIZE`] so a
//! malformed or hostile peer cannot force unbounded allocation;
//! the cap leaves room for base64 data-URI image payloads.

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::{ProtocolError, PushEvent, Request, Response, UserId};

/// Maximum encoded envelope body size in bytes (16 MiB).
pub const MAX_ENVELOPE_SIZE: usize = 16 * 1024 * 1024;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Top-level wire frame.
///
/// The handshake is the first envelope a client sends: `Hello` with
/// its user identifier. After that, clients send `Request` and the
/// server answers with `Response` (correlated by `request_id`) and
/// pushes unsolicited `Event` envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    /// Connection handshake carrying the authenticated user identity.
    Hello {
        /// User this connection belongs to.
        user: UserId,
    },

    /// Client-to-server operation.
    Request {
        /// Caller-chosen correlation id, echoed in the response.
        request_id: u64,
        /// The operation.
        request: Request,
    },

    /// Server-to-client operation result.
    Response {
        /// Correlation id of the triggering request.
        request_id: u64,
        /// The result.
        response: Response,
    },

    /// Server-initiated push event.
    Event(PushEvent),
}

impl Envelope {
    /// Encode this envelope with its length prefix into `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let mut body = Vec::new();
        ciborium::ser::into_writer(self, &mut body)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;

        if body.len() > MAX_ENVELOPE_SIZE {
            return Err(ProtocolError::TooLarge { size: body.len(), max: MAX_ENVELOPE_SIZE });
        }

        buf.put_u32(body.len() as u32);
        buf.extend_from_slice(&body);
        Ok(())
    }

    /// Decode one envelope from a complete length-prefixed frame.
    ///
    /// `buf` must contain the full frame; partial reads are handled by
    /// the transport via [`body_len`].
    pub fn decode(mut buf: &[u8]) -> Result<Self, ProtocolError> {
        let body_len = body_len(buf)?;
        if buf.len() < LENGTH_PREFIX_SIZE + body_len {
            return Err(ProtocolError::Truncated {
                need: LENGTH_PREFIX_SIZE + body_len,
                have: buf.len(),
            });
        }

        buf.advance(LENGTH_PREFIX_SIZE);
        ciborium::de::from_reader(&buf[..body_len])
            .map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

/// Body length announced by a frame's length prefix.
///
/// Rejects lengths above [`MAX_ENVELOPE_SIZE`] before any allocation.
pub fn body_len(buf: &[u8]) -> Result<usize, ProtocolError> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Err(ProtocolError::Truncated { need: LENGTH_PREFIX_SIZE, have: buf.len() });
    }

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > MAX_ENVELOPE_SIZE {
        return Err(ProtocolError::TooLarge { size: len, max: MAX_ENVELOPE_SIZE });
    }

    Ok(len)
}
