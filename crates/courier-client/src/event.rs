//! Store events and actions.

use courier_proto::{ApiError, ImageUpload, Message, MessageId, PushEvent, UserId, UserProfile};

use crate::store::LoadToken;

/// Events the caller feeds into the store.
///
/// The caller is responsible for:
/// - Forwarding application intents (open a conversation, send, edit)
/// - Delivering operation results from the network, tagging history
///   results with the [`LoadToken`] from the originating
///   [`StoreAction::FetchHistory`]
/// - Delivering server push events
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Application wants the user roster.
    LoadRoster,

    /// Application opened the conversation with `peer`.
    OpenConversation {
        /// Conversation counterpart.
        peer: UserId,
    },

    /// Application closed the open conversation.
    CloseConversation,

    /// Application wants to send a message.
    SendMessage {
        /// Receiving user.
        to: UserId,
        /// Text body.
        text: Option<String>,
        /// Image payload as a base64 data URI.
        image: Option<ImageUpload>,
    },

    /// Application wants to edit a message.
    EditMessage {
        /// Message to edit.
        id: MessageId,
        /// New text body. `None` clears the text.
        text: Option<String>,
        /// New image payload. `None` clears the image.
        image: Option<ImageUpload>,
    },

    /// Application wants to delete a message.
    DeleteMessage {
        /// Message to delete.
        id: MessageId,
    },

    /// Application wants to replace a message's image.
    ReplaceImage {
        /// Message to update.
        id: MessageId,
        /// Replacement image payload.
        image: ImageUpload,
    },

    /// Application wants to clear a message's image.
    RemoveImage {
        /// Message to update.
        id: MessageId,
    },

    /// Roster fetch completed.
    RosterLoaded(Vec<UserProfile>),

    /// History fetch completed.
    HistoryLoaded {
        /// Token of the originating fetch.
        token: LoadToken,
        /// Conversation history, chronological.
        messages: Vec<Message>,
    },

    /// History fetch failed.
    HistoryFailed {
        /// Token of the originating fetch.
        token: LoadToken,
        /// Failure description.
        reason: String,
    },

    /// A send completed; the server returned the persisted message.
    SendCompleted(Message),

    /// An edit or image mutation completed with a surviving message.
    EditCompleted(Message),

    /// A delete completed, or a mutation emptied the message and the
    /// server deleted it.
    MutationDeleted(MessageId),

    /// A mutation was rejected by the server.
    ///
    /// No local state changes; the caller surfaces the error.
    MutationFailed(ApiError),

    /// Server push event.
    Push(PushEvent),
}

/// Actions the store produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Fetch the user roster.
    FetchRoster,

    /// Fetch conversation history with `peer`.
    ///
    /// The result must come back as [`StoreEvent::HistoryLoaded`] or
    /// [`StoreEvent::HistoryFailed`] carrying the same `token`.
    FetchHistory {
        /// Conversation counterpart.
        peer: UserId,
        /// Correlation token; results with a stale token are ignored.
        token: LoadToken,
    },

    /// Send a new message.
    Send {
        /// Receiving user.
        to: UserId,
        /// Text body.
        text: Option<String>,
        /// Image payload.
        image: Option<ImageUpload>,
    },

    /// Edit an existing message.
    Edit {
        /// Message to edit.
        id: MessageId,
        /// New text body.
        text: Option<String>,
        /// New image payload.
        image: Option<ImageUpload>,
    },

    /// Delete a message.
    Delete {
        /// Message to delete.
        id: MessageId,
    },

    /// Replace a message's image.
    ReplaceImage {
        /// Message to update.
        id: MessageId,
        /// Replacement image payload.
        image: ImageUpload,
    },

    /// Clear a message's image.
    RemoveImage {
        /// Message to update.
        id: MessageId,
    },

    /// Visible state changed; re-render.
    Render,

    /// A message arrived outside the open conversation; surface a
    /// notification.
    Notify {
        /// The arriving message.
        message: Message,
    },
}
