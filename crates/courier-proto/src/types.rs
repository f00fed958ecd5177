//! Core data model: users, messages, and conversation keys.

use serde::{Deserialize, Serialize};

/// Opaque unique user identifier.
///
/// Identity is immutable after signup. Presence is never part of the
/// identity - it is ephemeral and carried only by
/// [`crate::PushEvent::OnlineUsers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque unique message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public user profile as shown in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name.
    pub display_name: String,
    /// Avatar URL in external object storage. `None` if never set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A direct message between two users.
///
/// # Invariants
///
/// A message must carry non-empty text OR an image URL. A message with
/// neither is considered deleted and must not exist; mutations that
/// would empty a message delete it instead (see the server driver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Sending user.
    pub sender: UserId,
    /// Receiving user.
    pub receiver: UserId,
    /// Text body. `None` or empty when the message is image-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image URL in external object storage. `None` for text-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Creation timestamp, Unix milliseconds.
    pub created_at_ms: u64,
    /// Last-modification timestamp, Unix milliseconds.
    pub updated_at_ms: u64,
}

impl Message {
    /// True when the message has neither text nor image.
    ///
    /// An empty message violates the data-model invariant and must be
    /// deleted rather than persisted.
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().is_none_or(|t| t.trim().is_empty()) && self.image.is_none()
    }

    /// Counterpart of `user` in this message's conversation.
    ///
    /// Returns `None` if `user` is not a participant.
    pub fn counterpart(&self, user: UserId) -> Option<UserId> {
        if self.sender == user {
            Some(self.receiver)
        } else if self.receiver == user {
            Some(self.sender)
        } else {
            None
        }
    }

    /// Conversation this message belongs to.
    pub fn conversation(&self) -> ConversationKey {
        ConversationKey::new(self.sender, self.receiver)
    }
}

/// Normalized unordered pair of conversation participants.
///
/// No conversation record is ever stored; a conversation is always the
/// message set filtered by this key, ordered by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    /// Smaller participant id.
    pub low: UserId,
    /// Larger participant id.
    pub high: UserId,
}

impl ConversationKey {
    /// Build a key from two participants in either order.
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b { Self { low: a, high: b } } else { Self { low: b, high: a } }
    }

    /// True when `user` is one of the two participants.
    pub fn contains(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }
}

/// Client-supplied image payload: a base64 `data:` URI.
///
/// Uploaded to the external object store before the message is
/// persisted; only the resulting URL is ever stored on a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageUpload(pub String);
