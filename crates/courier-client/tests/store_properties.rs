//! Property-based tests for client-store convergence invariants.

use courier_client::{ChatStore, Conversation, StoreAction, StoreEvent};
use courier_proto::{Message, MessageId, PushEvent, UserId};
use proptest::prelude::*;

const ME: u64 = 1;
const PEER: u64 = 2;
const OTHER: u64 = 3;

fn msg(id: u64, sender: u64, receiver: u64) -> Message {
    Message {
        id: MessageId(id),
        sender: UserId(sender),
        receiver: UserId(receiver),
        text: Some(format!("m{id}")),
        image: None,
        created_at_ms: 1000 + id,
        updated_at_ms: 1000 + id,
    }
}

/// A push the server might deliver, over a small id space.
#[derive(Debug, Clone)]
enum Op {
    Created { id: u64, sender: u64 },
    Updated { id: u64 },
    Deleted { id: u64 },
}

// Ids are globally unique server-side, so the two senders draw from
// disjoint ranges.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..8).prop_map(|id| Op::Created { id, sender: PEER }),
        (8u64..16).prop_map(|id| Op::Created { id, sender: OTHER }),
        (0u64..8).prop_map(|id| Op::Updated { id }),
        (0u64..8).prop_map(|id| Op::Deleted { id }),
    ]
}

fn ready_store() -> ChatStore {
    let mut store = ChatStore::new(UserId(ME));
    let actions = store.handle(StoreEvent::OpenConversation { peer: UserId(PEER) });
    let Some(StoreAction::FetchHistory { token, .. }) = actions.first() else {
        unreachable!("open always issues a fetch");
    };
    store.handle(StoreEvent::HistoryLoaded { token: *token, messages: Vec::new() });
    store
}

fn apply(store: &mut ChatStore, op: &Op) {
    let event = match op {
        Op::Created { id, sender } => PushEvent::MessageCreated(msg(*id, *sender, ME)),
        Op::Updated { id } => PushEvent::MessageUpdated(msg(*id, PEER, ME)),
        Op::Deleted { id } => PushEvent::MessageDeleted(MessageId(*id)),
    };
    store.handle(StoreEvent::Push(event));
}

fn conversation_ids(store: &ChatStore) -> Vec<u64> {
    match store.conversation() {
        Conversation::Ready { messages, .. } => messages.iter().map(|m| m.id.0).collect(),
        _ => unreachable!("store stays loaded"),
    }
}

proptest! {
    /// No interleaving of pushes ever produces two entries with the
    /// same message id.
    #[test]
    fn ids_stay_unique_under_arbitrary_pushes(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut store = ready_store();

        for op in &ops {
            apply(&mut store, op);

            let mut ids = conversation_ids(&store);
            let len = ids.len();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), len, "duplicate message id in conversation");
        }
    }

    /// Only messages of the open conversation ever land in it, and the
    /// open peer never accumulates unread counts.
    #[test]
    fn open_conversation_stays_scoped(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut store = ready_store();

        for op in &ops {
            apply(&mut store, op);
        }

        match store.conversation() {
            Conversation::Ready { messages, .. } => {
                for m in messages {
                    let key = m.conversation();
                    prop_assert!(key.contains(UserId(ME)) && key.contains(UserId(PEER)));
                }
            },
            _ => prop_assert!(false, "store must stay loaded"),
        }

        prop_assert_eq!(store.unread().count(UserId(PEER)), 0);
    }

    /// Every created push from outside the open conversation counts
    /// exactly once toward that sender's unread badge.
    #[test]
    fn unread_counts_match_outside_pushes(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut store = ready_store();

        let mut expected = 0u64;
        for op in &ops {
            if let Op::Created { sender: OTHER, .. } = op {
                expected += 1;
            }
            apply(&mut store, op);
        }

        prop_assert_eq!(store.unread().count(UserId(OTHER)), expected);
    }

    /// An update never reorders the conversation.
    #[test]
    fn updates_preserve_order(
        creates in prop::collection::vec(0u64..16, 1..12),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut store = ready_store();
        for id in &creates {
            apply(&mut store, &Op::Created { id: *id, sender: PEER });
        }

        let before = conversation_ids(&store);
        let target = before[pick.index(before.len())];
        apply(&mut store, &Op::Updated { id: target });

        prop_assert_eq!(conversation_ids(&store), before);
    }
}
