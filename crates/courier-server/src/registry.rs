//! Connection registry mapping users to live push connections.
//!
//! The registry maintains bidirectional mappings: user → connection
//! (for event delivery) and connection → user (for O(1) cleanup on
//! disconnect). Both maps are updated inside single `&mut self`
//! methods so a concurrent lookup can never observe a half-updated
//! state; the driver owns the registry behind one logical writer.
//!
//! At most one connection per user: a reconnect displaces the previous
//! connection (last wins).

use std::collections::HashMap;

use courier_proto::UserId;

/// Registry of live connections keyed by user.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// User → connection id.
    user_connections: HashMap<UserId, u64>,
    /// Connection id → user (reverse index).
    connection_users: HashMap<u64, UserId>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user.
    ///
    /// Replaces any existing connection for that user and returns the
    /// displaced connection id so the caller can close it. The reverse
    /// entry for the displaced connection is removed in the same step.
    pub fn register(&mut self, user: UserId, connection_id: u64) -> Option<u64> {
        let displaced = self.user_connections.insert(user, connection_id);
        if let Some(old) = displaced {
            self.connection_users.remove(&old);
        }
        self.connection_users.insert(connection_id, user);
        displaced
    }

    /// Unregister by connection id.
    ///
    /// O(1) via the reverse index. Returns the user the connection
    /// belonged to, or `None` if the connection was unknown (already
    /// displaced by a reconnect, or never registered).
    pub fn unregister(&mut self, connection_id: u64) -> Option<UserId> {
        let user = self.connection_users.remove(&connection_id)?;

        // A reconnect may have re-pointed the user at a newer
        // connection; only remove the forward entry if it still refers
        // to this connection.
        if self.user_connections.get(&user) == Some(&connection_id) {
            self.user_connections.remove(&user);
        }

        Some(user)
    }

    /// Connection id for a user. `None` if the user is offline.
    pub fn connection_for_user(&self, user: UserId) -> Option<u64> {
        self.user_connections.get(&user).copied()
    }

    /// User a connection belongs to. `None` if unregistered.
    pub fn user_for_connection(&self, connection_id: u64) -> Option<UserId> {
        self.connection_users.get(&connection_id).copied()
    }

    /// All online user ids, sorted for deterministic broadcasts.
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.user_connections.keys().copied().collect();
        users.sort_unstable();
        users
    }

    /// All registered connection ids.
    pub fn connection_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.connection_users.keys().copied()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connection_users.len()
    }

    /// True when no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connection_users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut registry = ConnectionRegistry::new();

        assert_eq!(registry.register(UserId(1), 100), None);
        assert_eq!(registry.connection_for_user(UserId(1)), Some(100));
        assert_eq!(registry.user_for_connection(100), Some(UserId(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reconnect_displaces_previous_connection() {
        let mut registry = ConnectionRegistry::new();

        registry.register(UserId(1), 100);
        let displaced = registry.register(UserId(1), 200);

        assert_eq!(displaced, Some(100));
        assert_eq!(registry.connection_for_user(UserId(1)), Some(200));
        // Displaced connection leaves no dangling reverse entry.
        assert_eq!(registry.user_for_connection(100), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_cleans_both_indices() {
        let mut registry = ConnectionRegistry::new();

        registry.register(UserId(1), 100);
        assert_eq!(registry.unregister(100), Some(UserId(1)));

        assert_eq!(registry.connection_for_user(UserId(1)), None);
        assert_eq!(registry.user_for_connection(100), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_unknown_connection_is_noop() {
        let mut registry = ConnectionRegistry::new();
        registry.register(UserId(1), 100);

        assert_eq!(registry.unregister(999), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn stale_disconnect_after_reconnect_keeps_new_connection() {
        let mut registry = ConnectionRegistry::new();

        registry.register(UserId(1), 100);
        registry.register(UserId(1), 200);

        // The old connection's disconnect arrives late; it no longer
        // owns the reverse entry so nothing changes.
        assert_eq!(registry.unregister(100), None);
        assert_eq!(registry.connection_for_user(UserId(1)), Some(200));
        assert_eq!(registry.online_users(), vec![UserId(1)]);
    }

    #[test]
    fn online_users_is_sorted() {
        let mut registry = ConnectionRegistry::new();

        registry.register(UserId(5), 100);
        registry.register(UserId(2), 200);
        registry.register(UserId(9), 300);

        assert_eq!(registry.online_users(), vec![UserId(2), UserId(5), UserId(9)]);
    }
}
