//! Scenario tests for client-store convergence.
//!
//! Replays realistic interleavings of request results and push events
//! against [`ChatStore`] instances and checks that the rendered
//! conversation converges with the server regardless of arrival order.

use courier_client::{ChatStore, Conversation, LoadToken, StoreAction, StoreEvent};
use courier_proto::{Message, MessageId, PushEvent, UserId};

fn msg(id: u64, sender: u64, receiver: u64, text: &str) -> Message {
    Message {
        id: MessageId(id),
        sender: UserId(sender),
        receiver: UserId(receiver),
        text: Some(text.to_string()),
        image: None,
        created_at_ms: 1000 * id,
        updated_at_ms: 1000 * id,
    }
}

fn open_token(store: &mut ChatStore, peer: u64) -> LoadToken {
    let actions = store.handle(StoreEvent::OpenConversation { peer: UserId(peer) });
    match actions.first() {
        Some(StoreAction::FetchHistory { token, .. }) => *token,
        other => panic!("expected a history fetch, got {other:?}"),
    }
}

fn messages_of(store: &ChatStore) -> Vec<Message> {
    match store.conversation() {
        Conversation::Ready { messages, .. } => messages.clone(),
        other => panic!("expected a loaded conversation, got {other:?}"),
    }
}

#[test]
fn history_and_push_for_the_same_message_yield_one_entry() {
    // Bob opens the conversation right as Alice's "hi" lands: the
    // history fetch already contains it AND the created push arrives.
    let mut bob = ChatStore::new(UserId(2));
    let hi = msg(1, 1, 2, "hi");

    let token = open_token(&mut bob, 1);
    bob.handle(StoreEvent::HistoryLoaded { token, messages: vec![hi.clone()] });
    bob.handle(StoreEvent::Push(PushEvent::MessageCreated(hi)));

    assert_eq!(messages_of(&bob).len(), 1);
}

#[test]
fn both_sides_converge_after_an_edit() {
    let original = msg(1, 1, 2, "helo");
    let mut edited = original.clone();
    edited.text = Some("hello".to_string());
    edited.updated_at_ms = 5000;

    // Alice: send confirmation, then her own edit confirmation.
    let mut alice = ChatStore::new(UserId(1));
    let token = open_token(&mut alice, 2);
    alice.handle(StoreEvent::HistoryLoaded { token, messages: Vec::new() });
    alice.handle(StoreEvent::SendCompleted(original.clone()));
    alice.handle(StoreEvent::EditCompleted(edited.clone()));

    // Bob: created push, then updated push.
    let mut bob = ChatStore::new(UserId(2));
    let token = open_token(&mut bob, 1);
    bob.handle(StoreEvent::HistoryLoaded { token, messages: Vec::new() });
    bob.handle(StoreEvent::Push(PushEvent::MessageCreated(original)));
    bob.handle(StoreEvent::Push(PushEvent::MessageUpdated(edited.clone())));

    assert_eq!(messages_of(&alice), vec![edited.clone()]);
    assert_eq!(messages_of(&alice), messages_of(&bob));
}

#[test]
fn both_sides_converge_after_a_delete() {
    let message = msg(1, 1, 2, "remove me");

    let mut alice = ChatStore::new(UserId(1));
    let token = open_token(&mut alice, 2);
    alice.handle(StoreEvent::HistoryLoaded { token, messages: vec![message.clone()] });
    // Bob deleted it; Alice gets the push, then her own stale view of
    // the deletion arrives again via a second event.
    alice.handle(StoreEvent::Push(PushEvent::MessageDeleted(message.id)));
    let second = alice.handle(StoreEvent::Push(PushEvent::MessageDeleted(message.id)));

    assert!(second.is_empty(), "repeated deletion must be a no-op");
    assert!(messages_of(&alice).is_empty());

    let mut bob = ChatStore::new(UserId(2));
    let token = open_token(&mut bob, 1);
    bob.handle(StoreEvent::HistoryLoaded { token, messages: vec![message.clone()] });
    bob.handle(StoreEvent::MutationDeleted(message.id));

    assert_eq!(messages_of(&alice), messages_of(&bob));
}

#[test]
fn switching_conversations_discards_the_older_fetch() {
    // Open A, then open B before A's history arrives. A's slow result
    // must not clobber B's conversation.
    let mut store = ChatStore::new(UserId(1));

    let token_a = open_token(&mut store, 2);
    let token_b = open_token(&mut store, 3);

    let a_history = vec![msg(1, 2, 1, "from a")];
    let b_history = vec![msg(2, 3, 1, "from b")];

    // B's result first, then A's stale one.
    store.handle(StoreEvent::HistoryLoaded { token: token_b, messages: b_history.clone() });
    let stale = store.handle(StoreEvent::HistoryLoaded { token: token_a, messages: a_history });

    assert!(stale.is_empty());
    assert_eq!(store.conversation().peer(), Some(UserId(3)));
    assert_eq!(messages_of(&store), b_history);
}

#[test]
fn unread_accumulates_while_conversation_is_elsewhere() {
    let mut store = ChatStore::new(UserId(1));
    let token = open_token(&mut store, 2);
    store.handle(StoreEvent::HistoryLoaded { token, messages: Vec::new() });

    // Two messages from user 3 while user 2's conversation is open.
    store.handle(StoreEvent::Push(PushEvent::MessageCreated(msg(1, 3, 1, "ping"))));
    store.handle(StoreEvent::Push(PushEvent::MessageCreated(msg(2, 3, 1, "ping?"))));

    assert_eq!(store.unread().count(UserId(3)), 2);
    assert!(messages_of(&store).is_empty());

    // Opening user 3's conversation clears the badge.
    open_token(&mut store, 3);
    assert_eq!(store.unread().count(UserId(3)), 0);
}

#[test]
fn restored_unread_snapshot_never_lowers_live_counts() {
    let mut store = ChatStore::new(UserId(1));
    store.handle(StoreEvent::Push(PushEvent::MessageCreated(msg(1, 2, 1, "a"))));
    store.handle(StoreEvent::Push(PushEvent::MessageCreated(msg(2, 2, 1, "b"))));

    // Snapshot taken before the second message arrived.
    let mut snapshot = courier_client::UnreadCounts::new();
    snapshot.increment(UserId(2));

    store.restore_unread(&snapshot);

    assert_eq!(store.unread().count(UserId(2)), 2);
}
