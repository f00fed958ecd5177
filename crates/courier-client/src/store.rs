//! Client-side conversation store.
//!
//! Action-based state machine holding everything a chat UI renders:
//! the roster, the online set, the open conversation, and unread
//! counts. It receives events ([`StoreEvent`]), processes them through
//! pure logic, and returns actions ([`StoreAction`]) for the caller to
//! execute. No I/O happens here.
//!
//! The store converges with the server regardless of how request
//! results and push events interleave: inserts are deduplicated by
//! message id, updates replace in place, and deletions of absent
//! messages are no-ops.

use courier_proto::{Message, MessageId, PushEvent, UserId, UserProfile};

use crate::{
    event::{StoreAction, StoreEvent},
    unread::UnreadCounts,
};

/// Correlation token for a history fetch.
///
/// Tokens are monotonically increasing per store. A history result
/// carrying anything but the newest token is discarded, so a slow
/// fetch for a previously open conversation can never overwrite the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadToken(u64);

/// State of the open conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    /// No conversation is open.
    Idle,

    /// A conversation was opened and its history is in flight.
    Loading {
        /// Conversation counterpart.
        peer: UserId,
        /// Token the history result must carry.
        token: LoadToken,
    },

    /// The conversation is open with its history loaded.
    Ready {
        /// Conversation counterpart.
        peer: UserId,
        /// Messages, chronological.
        messages: Vec<Message>,
    },
}

impl Conversation {
    /// The open conversation's counterpart, if any.
    pub fn peer(&self) -> Option<UserId> {
        match self {
            Conversation::Idle => None,
            Conversation::Loading { peer, .. } | Conversation::Ready { peer, .. } => Some(*peer),
        }
    }
}

/// Client-side chat state machine.
pub struct ChatStore {
    /// Local user.
    me: UserId,
    /// Known users, excluding `me`.
    roster: Vec<UserProfile>,
    /// Currently online users, replaced wholesale by presence pushes.
    online: Vec<UserId>,
    /// The open conversation.
    conversation: Conversation,
    /// Per-sender unread counts.
    unread: UnreadCounts,
    /// Created-message pushes for the open pair that arrived while its
    /// history was in flight; replayed when the snapshot lands.
    pending: Vec<Message>,
    /// Last issued history-fetch token.
    last_token: u64,
    /// Last surfaced failure, for a status line. Cleared when a
    /// conversation is opened or closed.
    status: Option<String>,
}

impl ChatStore {
    /// Create a store for the local user `me`.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            roster: Vec::new(),
            online: Vec::new(),
            conversation: Conversation::Idle,
            unread: UnreadCounts::new(),
            pending: Vec::new(),
            last_token: 0,
            status: None,
        }
    }

    /// Local user.
    pub fn me(&self) -> UserId {
        self.me
    }

    /// Known users, excluding the local user.
    pub fn roster(&self) -> &[UserProfile] {
        &self.roster
    }

    /// Whether `user` is currently online.
    pub fn is_online(&self, user: UserId) -> bool {
        self.online.contains(&user)
    }

    /// The open conversation.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Unread counts, for rendering badges and persisting snapshots.
    pub fn unread(&self) -> &UnreadCounts {
        &self.unread
    }

    /// Merge a restored unread snapshot; see [`UnreadCounts::merge`].
    pub fn restore_unread(&mut self, snapshot: &UnreadCounts) {
        self.unread.merge(snapshot);
    }

    /// Last surfaced failure, for a status line. `None` when the last
    /// operation succeeded.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Process an event and return actions to execute.
    ///
    /// This is the only entry point; every state change flows through
    /// here.
    pub fn handle(&mut self, event: StoreEvent) -> Vec<StoreAction> {
        match event {
            StoreEvent::LoadRoster => vec![StoreAction::FetchRoster],

            StoreEvent::OpenConversation { peer } => self.open_conversation(peer),

            StoreEvent::CloseConversation => {
                self.conversation = Conversation::Idle;
                self.pending.clear();
                self.status = None;
                vec![StoreAction::Render]
            },

            StoreEvent::SendMessage { to, text, image } => {
                let has_text = text.as_deref().is_some_and(|t| !t.trim().is_empty());
                if !has_text && image.is_none() {
                    return Vec::new();
                }
                vec![StoreAction::Send { to, text, image }]
            },

            StoreEvent::EditMessage { id, text, image } => {
                vec![StoreAction::Edit { id, text, image }]
            },
            StoreEvent::DeleteMessage { id } => vec![StoreAction::Delete { id }],
            StoreEvent::ReplaceImage { id, image } => {
                vec![StoreAction::ReplaceImage { id, image }]
            },
            StoreEvent::RemoveImage { id } => vec![StoreAction::RemoveImage { id }],

            StoreEvent::RosterLoaded(users) => {
                self.roster = users;
                vec![StoreAction::Render]
            },

            StoreEvent::HistoryLoaded { token, messages } => {
                match self.conversation {
                    Conversation::Loading { peer, token: expected } if token == expected => {
                        self.conversation = Conversation::Ready { peer, messages };

                        // Replay pushes held during the fetch; upsert
                        // dedupes any the snapshot already contains.
                        let held = std::mem::take(&mut self.pending);
                        for message in &held {
                            self.apply_upsert(message);
                        }

                        vec![StoreAction::Render]
                    },
                    // Stale result for a conversation no longer open.
                    _ => Vec::new(),
                }
            },

            StoreEvent::HistoryFailed { token, reason } => match self.conversation {
                Conversation::Loading { token: expected, .. } if token == expected => {
                    self.conversation = Conversation::Idle;
                    self.pending.clear();
                    self.status = Some(reason);
                    vec![StoreAction::Render]
                },
                _ => Vec::new(),
            },

            StoreEvent::SendCompleted(message) | StoreEvent::EditCompleted(message) => {
                self.apply_upsert(&message)
            },

            StoreEvent::MutationDeleted(id) => self.apply_delete(id),

            StoreEvent::MutationFailed(error) => {
                self.status = Some(error.to_string());
                vec![StoreAction::Render]
            },

            StoreEvent::Push(push) => self.apply_push(push),
        }
    }

    /// Open the conversation with `peer`: clear their unread count and
    /// start a history fetch with a fresh token.
    fn open_conversation(&mut self, peer: UserId) -> Vec<StoreAction> {
        self.last_token += 1;
        let token = LoadToken(self.last_token);

        self.conversation = Conversation::Loading { peer, token };
        self.pending.clear();
        self.unread.clear(peer);
        self.status = None;

        vec![StoreAction::FetchHistory { peer, token }, StoreAction::Render]
    }

    /// Apply a server push event.
    fn apply_push(&mut self, push: PushEvent) -> Vec<StoreAction> {
        match push {
            PushEvent::OnlineUsers(users) => {
                self.online = users;
                vec![StoreAction::Render]
            },

            PushEvent::MessageCreated(message) => {
                // A push for the open pair can race the history fetch;
                // hold it so the snapshot cannot hide it.
                if self.hold_if_loading(&message) {
                    return Vec::new();
                }

                let mut actions = self.apply_upsert(&message);

                if message.sender != self.me && self.conversation.peer() != Some(message.sender) {
                    self.unread.increment(message.sender);
                    actions.push(StoreAction::Notify { message });
                    if !actions.contains(&StoreAction::Render) {
                        actions.push(StoreAction::Render);
                    }
                }

                actions
            },

            PushEvent::MessageUpdated(message) => {
                if let Some(held) = self.pending.iter_mut().find(|m| m.id == message.id) {
                    *held = message;
                    return Vec::new();
                }
                self.apply_upsert(&message)
            },

            PushEvent::MessageDeleted(id) => {
                let held = self.pending.len();
                self.pending.retain(|m| m.id != id);
                if self.pending.len() < held {
                    return Vec::new();
                }
                self.apply_delete(id)
            },
        }
    }

    /// Hold a created message that belongs to the conversation whose
    /// history is in flight. Returns `false` when nothing is loading or
    /// the message belongs elsewhere.
    fn hold_if_loading(&mut self, message: &Message) -> bool {
        let Conversation::Loading { peer, .. } = self.conversation else {
            return false;
        };

        let key = message.conversation();
        if !key.contains(self.me) || !key.contains(peer) || self.me == peer {
            return false;
        }

        if !self.pending.iter().any(|m| m.id == message.id) {
            self.pending.push(message.clone());
        }
        true
    }

    /// Insert or update a message in the open conversation.
    ///
    /// Updates replace in place, preserving position. Inserts are
    /// appended only when the message belongs to the open, loaded
    /// conversation and its id is not already present.
    fn apply_upsert(&mut self, message: &Message) -> Vec<StoreAction> {
        let Conversation::Ready { peer, messages } = &mut self.conversation else {
            return Vec::new();
        };

        if let Some(existing) = messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message.clone();
            return vec![StoreAction::Render];
        }

        let key = message.conversation();
        if key.contains(self.me) && key.contains(*peer) && self.me != *peer {
            messages.push(message.clone());
            return vec![StoreAction::Render];
        }

        Vec::new()
    }

    /// Remove a message from the open conversation; no-op if absent.
    fn apply_delete(&mut self, id: MessageId) -> Vec<StoreAction> {
        let Conversation::Ready { messages, .. } = &mut self.conversation else {
            return Vec::new();
        };

        let before = messages.len();
        messages.retain(|m| m.id != id);

        if messages.len() < before { vec![StoreAction::Render] } else { Vec::new() }
    }
}
