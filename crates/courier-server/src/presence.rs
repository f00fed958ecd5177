//! Presence broadcasting.
//!
//! On any registry change the full online-user set is pushed to every
//! connected handle, not just the changed one. Full-set replacement is
//! idempotent: redundant broadcasts cannot corrupt client state, and
//! no prior-state diffing is needed.

use courier_proto::PushEvent;

use crate::{driver::ServerAction, registry::ConnectionRegistry};

/// Build push actions delivering the current online set to all
/// connections.
pub fn broadcast_online(registry: &ConnectionRegistry) -> Vec<ServerAction> {
    let online = registry.online_users();

    registry
        .connection_ids()
        .map(|connection_id| ServerAction::Push {
            connection_id,
            event: PushEvent::OnlineUsers(online.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use courier_proto::UserId;

    use super::*;

    #[test]
    fn broadcast_reaches_every_connection() {
        let mut registry = ConnectionRegistry::new();
        registry.register(UserId(1), 100);
        registry.register(UserId(2), 200);

        let actions = broadcast_online(&registry);
        assert_eq!(actions.len(), 2);

        for action in &actions {
            match action {
                ServerAction::Push { event: PushEvent::OnlineUsers(users), .. } => {
                    assert_eq!(users, &vec![UserId(1), UserId(2)]);
                },
                other => panic!("unexpected action: {other:?}"),
            }
        }
    }

    #[test]
    fn broadcast_with_empty_registry_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(broadcast_online(&registry).is_empty());
    }
}
