//! Server-initiated push events.

use serde::{Deserialize, Serialize};

use crate::{Message, MessageId, UserId};

/// Asynchronous server-to-client notification.
///
/// Delivered over the persistent connection, as opposed to a
/// request/response exchange. The tagged union gives the client
/// exhaustiveness at every dispatch site; there are no ad-hoc
/// per-event payload shapes.
///
/// Delivery is at-most-once and best-effort: a client that is offline
/// when an event is emitted only sees the result on its next history
/// fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushEvent {
    /// Full replacement of the online-user set.
    ///
    /// Broadcast to every connection on any registry change. Always
    /// the complete set, never a delta, so redundant delivery cannot
    /// corrupt client state.
    OnlineUsers(Vec<UserId>),

    /// A message was created. Carries the full persisted message.
    MessageCreated(Message),

    /// A message was mutated in place. Carries the full updated
    /// message.
    MessageUpdated(Message),

    /// A message was deleted. Carries only the identifier.
    MessageDeleted(MessageId),
}

/// Kind of message mutation, used when routing fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Message was created.
    Created,
    /// Message content changed.
    Updated,
    /// Message was removed.
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_event_cbor_round_trip() {
        let event = PushEvent::MessageDeleted(MessageId(42));

        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&event, &mut encoded).unwrap();
        let decoded: PushEvent = ciborium::de::from_reader(&encoded[..]).unwrap();

        assert_eq!(event, decoded);
    }

    #[test]
    fn online_users_is_full_set() {
        let event = PushEvent::OnlineUsers(vec![UserId(1), UserId(2), UserId(3)]);

        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&event, &mut encoded).unwrap();
        let decoded: PushEvent = ciborium::de::from_reader(&encoded[..]).unwrap();

        match decoded {
            PushEvent::OnlineUsers(users) => assert_eq!(users.len(), 3),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
