//! Request/response payload types.
//!
//! The resource operations of the REST surface, carried as typed
//! request/response pairs over the persistent connection. Resource
//! ambiguity is resolved by identifiers in the payload rather than in
//! a URL path.

use serde::{Deserialize, Serialize};

use crate::{ImageUpload, Message, MessageId, UserId, UserProfile};

/// Client-to-server resource operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// All users except the caller, for the roster.
    ListUsers,

    /// Full message history between the caller and `peer`,
    /// chronological.
    FetchConversation {
        /// Conversation counterpart.
        peer: UserId,
    },

    /// Create a message from the caller to `to`.
    ///
    /// Requires non-empty text or an image. The image, if present, is
    /// uploaded to the external object store before persistence.
    SendMessage {
        /// Receiving user.
        to: UserId,
        /// Text body.
        text: Option<String>,
        /// Image payload as a base64 data URI.
        image: Option<ImageUpload>,
    },

    /// Replace text and image of an existing message.
    ///
    /// An edit that leaves the message with neither text nor image
    /// deletes it; the response is then `Deleted`, not `Message`.
    EditMessage {
        /// Message to edit.
        id: MessageId,
        /// New text body. `None` clears the text.
        text: Option<String>,
        /// New image payload. `None` clears the image.
        image: Option<ImageUpload>,
    },

    /// Remove a message.
    DeleteMessage {
        /// Message to delete.
        id: MessageId,
    },

    /// Upload a new image and set it on an existing message.
    ReplaceImage {
        /// Message to update.
        id: MessageId,
        /// Replacement image payload.
        image: ImageUpload,
    },

    /// Clear the image field of an existing message.
    ///
    /// Deletes the message if it has no text either.
    RemoveImage {
        /// Message to update.
        id: MessageId,
    },
}

/// Server-to-client operation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Roster of user profiles.
    Users(Vec<UserProfile>),
    /// Conversation history, chronological.
    Conversation(Vec<Message>),
    /// Created or updated message.
    Message(Message),
    /// Deletion confirmation.
    Deleted(MessageId),
    /// Operation failed.
    Error(ApiError),
}

/// Structured operation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code identifying the type of error.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ApiError {
    /// No valid session for the connection.
    pub const AUTH_REQUIRED: u16 = 0x0001;
    /// Malformed or unacceptable payload.
    pub const VALIDATION: u16 = 0x0002;
    /// Referenced message does not exist.
    pub const NOT_FOUND: u16 = 0x0003;
    /// Persistence backend failed.
    pub const STORAGE_ERROR: u16 = 0x0004;
    /// Object-store upload or data-URI decoding failed.
    pub const MEDIA_ERROR: u16 = 0x0005;

    /// Create an authentication-required error.
    pub fn auth_required() -> Self {
        Self { code: Self::AUTH_REQUIRED, message: "authentication required".to_string() }
    }

    /// Create a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self { code: Self::VALIDATION, message: reason.into() }
    }

    /// Create a message-not-found error.
    pub fn not_found(id: MessageId) -> Self {
        Self { code: Self::NOT_FOUND, message: format!("message not found: {id}") }
    }

    /// Create a storage error.
    pub fn storage_error(reason: impl Into<String>) -> Self {
        Self { code: Self::STORAGE_ERROR, message: reason.into() }
    }

    /// Create a media error.
    pub fn media_error(reason: impl Into<String>) -> Self {
        Self { code: Self::MEDIA_ERROR, message: reason.into() }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "api error {:#06x}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_cbor_round_trip() {
        let request = Request::SendMessage {
            to: UserId(7),
            text: Some("hi".to_string()),
            image: None,
        };

        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&request, &mut encoded).unwrap();
        let decoded: Request = ciborium::de::from_reader(&encoded[..]).unwrap();

        assert_eq!(request, decoded);
    }

    #[test]
    fn api_error_constructors() {
        assert_eq!(ApiError::auth_required().code, ApiError::AUTH_REQUIRED);
        assert_eq!(ApiError::not_found(MessageId(9)).code, ApiError::NOT_FOUND);
        assert!(ApiError::not_found(MessageId(9)).message.contains('9'));
        assert_eq!(ApiError::validation("empty").code, ApiError::VALIDATION);
    }
}
