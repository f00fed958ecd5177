//! In-memory store implementation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use courier_proto::{Message, MessageId, UserId, UserProfile};

use super::{MessageStore, StoreError, key_of};

/// In-memory store for production-without-a-database and tests.
///
/// Uses `HashMap` for message and profile lookups. All state is
/// wrapped in Arc<Mutex<>> so clones share the same underlying
/// storage. Conversation reads are O(messages) - acceptable for the
/// in-memory backend; a database implementation would index by
/// participant pair.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Message id → message.
    messages: HashMap<MessageId, Message>,
    /// User id → profile.
    users: HashMap<UserId, UserProfile>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored messages.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked
    /// while holding the lock). Acceptable for the in-memory backend.
    #[allow(clippy::expect_used)]
    pub fn message_count(&self) -> usize {
        self.inner.lock().expect("mutex poisoned").messages.len()
    }
}

impl MessageStore for MemoryStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("mutex poisoned");

        debug_assert!(!message.is_empty());

        if inner.messages.contains_key(&message.id) {
            return Err(StoreError::Backend(format!("duplicate message id: {}", message.id)));
        }

        inner.messages.insert(message.id, message.clone());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        Ok(self.inner.lock().expect("mutex poisoned").messages.get(&id).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn update_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("mutex poisoned");

        match inner.messages.get_mut(&message.id) {
            Some(existing) => {
                *existing = message.clone();
                Ok(())
            },
            None => Err(StoreError::NotFound(message.id)),
        }
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn delete_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        Ok(self.inner.lock().expect("mutex poisoned").messages.remove(&id))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn conversation(&self, a: UserId, b: UserId) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.lock().expect("mutex poisoned");
        let key = key_of(a, b);

        let mut messages: Vec<Message> =
            inner.messages.values().filter(|m| m.conversation() == key).cloned().collect();
        messages.sort_by_key(|m| (m.created_at_ms, m.id));

        Ok(messages)
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn ensure_user(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("mutex poisoned")
            .users
            .entry(profile.id)
            .or_insert_with(|| profile.clone());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn list_users(&self, except: UserId) -> Result<Vec<UserProfile>, StoreError> {
        let inner = self.inner.lock().expect("mutex poisoned");

        let mut users: Vec<UserProfile> =
            inner.users.values().filter(|u| u.id != except).cloned().collect();
        users.sort_by_key(|u| u.id);

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: u64, sender: u64, receiver: u64, at: u64) -> Message {
        Message {
            id: MessageId(id),
            sender: UserId(sender),
            receiver: UserId(receiver),
            text: Some(format!("m{id}")),
            image: None,
            created_at_ms: at,
            updated_at_ms: at,
        }
    }

    #[test]
    fn insert_and_load() {
        let store = MemoryStore::new();
        let message = msg(1, 10, 20, 1000);

        store.insert_message(&message).unwrap();
        assert_eq!(store.message(MessageId(1)).unwrap(), Some(message));
        assert_eq!(store.message_count(), 1);
    }

    #[test]
    fn insert_duplicate_id_fails() {
        let store = MemoryStore::new();
        store.insert_message(&msg(1, 10, 20, 1000)).unwrap();

        assert!(store.insert_message(&msg(1, 10, 20, 2000)).is_err());
    }

    #[test]
    fn update_replaces_in_place() {
        let store = MemoryStore::new();
        store.insert_message(&msg(1, 10, 20, 1000)).unwrap();

        let mut edited = msg(1, 10, 20, 1000);
        edited.text = Some("edited".to_string());
        edited.updated_at_ms = 2000;
        store.update_message(&edited).unwrap();

        assert_eq!(store.message(MessageId(1)).unwrap(), Some(edited));
    }

    #[test]
    fn update_unknown_message_is_not_found() {
        let store = MemoryStore::new();
        let result = store.update_message(&msg(9, 10, 20, 1000));
        assert_eq!(result, Err(StoreError::NotFound(MessageId(9))));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.insert_message(&msg(1, 10, 20, 1000)).unwrap();

        assert!(store.delete_message(MessageId(1)).unwrap().is_some());
        assert!(store.delete_message(MessageId(1)).unwrap().is_none());
    }

    #[test]
    fn conversation_is_chronological_and_pair_scoped() {
        let store = MemoryStore::new();
        store.insert_message(&msg(1, 10, 20, 3000)).unwrap();
        store.insert_message(&msg(2, 20, 10, 1000)).unwrap();
        store.insert_message(&msg(3, 10, 30, 2000)).unwrap(); // different pair

        let conv = store.conversation(UserId(10), UserId(20)).unwrap();
        let ids: Vec<MessageId> = conv.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId(2), MessageId(1)]);

        // Both directions of the pair yield the same conversation.
        let conv_rev = store.conversation(UserId(20), UserId(10)).unwrap();
        assert_eq!(conv, conv_rev);
    }

    #[test]
    fn ensure_user_never_overwrites() {
        let store = MemoryStore::new();
        let original = UserProfile {
            id: UserId(1),
            display_name: "alice".to_string(),
            avatar_url: None,
        };
        store.ensure_user(&original).unwrap();

        let replacement = UserProfile {
            id: UserId(1),
            display_name: "impostor".to_string(),
            avatar_url: None,
        };
        store.ensure_user(&replacement).unwrap();

        let listed = store.list_users(UserId(99)).unwrap();
        assert_eq!(listed, vec![original]);
    }

    #[test]
    fn list_users_excludes_caller() {
        let store = MemoryStore::new();
        for id in [1u64, 2, 3] {
            store
                .ensure_user(&UserProfile {
                    id: UserId(id),
                    display_name: format!("u{id}"),
                    avatar_url: None,
                })
                .unwrap();
        }

        let listed = store.list_users(UserId(2)).unwrap();
        let ids: Vec<UserId> = listed.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![UserId(1), UserId(3)]);
    }
}
