//! Message event fan-out.
//!
//! Given a persisted message mutation, decides which connections learn
//! of it. Policy: notify exactly the conversation counterpart of the
//! caller - the caller already holds authoritative state from the
//! request/response result. If the counterpart is offline the event is
//! silently dropped; there is no outbox, retry, or queue (at-most-once
//! delivery). An offline client catches up on its next history fetch.

use courier_proto::{EventKind, Message, PushEvent, UserId};

use crate::{driver::ServerAction, registry::ConnectionRegistry};

/// Resolve fan-out actions for a message mutation performed by
/// `caller`.
///
/// Emits the full message for created/updated events and only the
/// identifier for deletions. Returns no actions when the counterpart
/// has no live connection.
pub fn route(
    registry: &ConnectionRegistry,
    caller: UserId,
    message: &Message,
    kind: EventKind,
) -> Vec<ServerAction> {
    let Some(counterpart) = message.counterpart(caller) else {
        // Caller is not a participant; nothing to deliver.
        return Vec::new();
    };

    let Some(connection_id) = registry.connection_for_user(counterpart) else {
        // Offline target: drop silently per the delivery contract.
        return Vec::new();
    };

    let event = match kind {
        EventKind::Created => PushEvent::MessageCreated(message.clone()),
        EventKind::Updated => PushEvent::MessageUpdated(message.clone()),
        EventKind::Deleted => PushEvent::MessageDeleted(message.id),
    };

    vec![ServerAction::Push { connection_id, event }]
}

#[cfg(test)]
mod tests {
    use courier_proto::MessageId;

    use super::*;

    fn message(sender: u64, receiver: u64) -> Message {
        Message {
            id: MessageId(1),
            sender: UserId(sender),
            receiver: UserId(receiver),
            text: Some("hi".to_string()),
            image: None,
            created_at_ms: 1000,
            updated_at_ms: 1000,
        }
    }

    #[test]
    fn routes_to_counterpart_connection() {
        let mut registry = ConnectionRegistry::new();
        registry.register(UserId(2), 200);

        let msg = message(1, 2);
        let actions = route(&registry, UserId(1), &msg, EventKind::Created);

        assert_eq!(actions, vec![ServerAction::Push {
            connection_id: 200,
            event: PushEvent::MessageCreated(msg),
        }]);
    }

    #[test]
    fn offline_counterpart_drops_event() {
        let registry = ConnectionRegistry::new();

        let msg = message(1, 2);
        assert!(route(&registry, UserId(1), &msg, EventKind::Created).is_empty());
    }

    #[test]
    fn receiver_mutation_notifies_sender_side() {
        let mut registry = ConnectionRegistry::new();
        registry.register(UserId(1), 100);

        // User 2 (the receiver) deletes; user 1 must learn of it.
        let msg = message(1, 2);
        let actions = route(&registry, UserId(2), &msg, EventKind::Deleted);

        assert_eq!(actions, vec![ServerAction::Push {
            connection_id: 100,
            event: PushEvent::MessageDeleted(MessageId(1)),
        }]);
    }

    #[test]
    fn deleted_event_carries_only_the_id() {
        let mut registry = ConnectionRegistry::new();
        registry.register(UserId(2), 200);

        let msg = message(1, 2);
        let actions = route(&registry, UserId(1), &msg, EventKind::Deleted);

        assert!(matches!(
            actions.as_slice(),
            [ServerAction::Push { event: PushEvent::MessageDeleted(MessageId(1)), .. }]
        ));
    }

    #[test]
    fn non_participant_caller_routes_nothing() {
        let mut registry = ConnectionRegistry::new();
        registry.register(UserId(2), 200);

        let msg = message(1, 2);
        assert!(route(&registry, UserId(99), &msg, EventKind::Updated).is_empty());
    }
}
