//! Courier client.
//!
//! Action-based client state machine for the Courier direct-messaging
//! protocol. Manages the roster, the online set, the open
//! conversation, and unread counts.
//!
//! # Architecture
//!
//! The store follows the same Sans-IO and action-based patterns as the
//! server driver. It receives events ([`StoreEvent`]), processes them
//! through pure state machine logic, and returns actions
//! ([`StoreAction`]) for the caller to execute. The state converges
//! with the server regardless of how request results and push events
//! interleave.
//!
//! # Components
//!
//! - [`ChatStore`]: Top-level state machine for one logged-in user
//! - [`StoreEvent`]: Events fed into the store
//! - [`StoreAction`]: Actions produced by the store
//! - [`UnreadCounts`]: Persistable per-sender unread counters
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedClient`]: Client with QUIC transport
//! - [`transport::connect`]: Connect to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod event;
mod store;
mod unread;

#[cfg(feature = "transport")]
pub mod transport;

pub use event::{StoreAction, StoreEvent};
pub use store::{ChatStore, Conversation, LoadToken};
pub use unread::UnreadCounts;
