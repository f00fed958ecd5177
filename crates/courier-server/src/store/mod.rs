//! Message and profile persistence abstraction.
//!
//! Trait-based abstraction over the persistence backend. The trait is
//! synchronous (no async) to keep the driver a pure state machine; a
//! database-backed implementation would wrap its own connection
//! handling. Conversations are never stored - they are always derived
//! from the message set filtered by participant pair.

mod error;
mod memory;

use courier_proto::{ConversationKey, Message, MessageId, UserId, UserProfile};
pub use error::StoreError;
pub use memory::MemoryStore;

/// Persistence abstraction for messages and user profiles.
///
/// Must be Clone (shared between the driver and the runtime), Send +
/// Sync, and synchronous. Implementations typically share internal
/// state via Arc, so clones access the same underlying storage.
pub trait MessageStore: Clone + Send + Sync + 'static {
    /// Persist a new message.
    ///
    /// # Invariants
    ///
    /// - Pre: no message with the same id exists
    /// - Pre: the message is not empty (has text or image)
    fn insert_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Load a message by id. `None` if it does not exist.
    fn message(&self, id: MessageId) -> Result<Option<Message>, StoreError>;

    /// Replace a message in place.
    ///
    /// Fails with [`StoreError::NotFound`] if the id is unknown.
    fn update_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Remove a message.
    ///
    /// Returns the removed message, or `None` if the id was unknown
    /// (idempotent).
    fn delete_message(&self, id: MessageId) -> Result<Option<Message>, StoreError>;

    /// All messages between two users, ordered by creation time
    /// (ties broken by id for a stable order).
    fn conversation(&self, a: UserId, b: UserId) -> Result<Vec<Message>, StoreError>;

    /// Create a profile if the user is unknown; never overwrites an
    /// existing profile.
    fn ensure_user(&self, profile: &UserProfile) -> Result<(), StoreError>;

    /// All user profiles except `except`, for the roster.
    fn list_users(&self, except: UserId) -> Result<Vec<UserProfile>, StoreError>;
}

/// Conversation key helper shared by implementations.
pub(crate) fn key_of(a: UserId, b: UserId) -> ConversationKey {
    ConversationKey::new(a, b)
}
