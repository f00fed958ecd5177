//! Shared protocol types for Courier direct messaging.
//!
//! This crate defines everything both sides of the wire agree on: the
//! message and user data model ([`Message`], [`UserProfile`]), the
//! request/response surface ([`Request`], [`Response`]), the
//! server-initiated push events ([`PushEvent`]), and the CBOR envelope
//! framing ([`Envelope`]).
//!
//! Payloads use CBOR because it is self-describing, compact, and needs
//! no code generation. Envelopes are length-prefixed on the wire; see
//! [`wire`] for framing details.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod errors;
mod event;
mod types;
pub mod wire;

pub use api::{ApiError, Request, Response};
pub use errors::ProtocolError;
pub use event::{EventKind, PushEvent};
pub use types::{ConversationKey, ImageUpload, Message, MessageId, UserId, UserProfile};
pub use wire::Envelope;

/// ALPN protocol identifier for QUIC transports.
pub const ALPN_PROTOCOL: &[u8] = b"courier";
