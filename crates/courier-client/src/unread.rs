//! Per-sender unread message counts.
//!
//! Counts survive restarts: the application serializes a snapshot on
//! change and restores it at startup. A restored snapshot is merged
//! with whatever accumulated in the meantime, keeping the larger count
//! per sender, so a count never goes backwards from a stale snapshot.

use std::collections::HashMap;

use courier_proto::UserId;
use serde::{Deserialize, Serialize};

/// Unread message counts keyed by sender.
///
/// A sender with no entry has zero unread messages; clearing removes
/// the entry entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    counts: HashMap<UserId, u64>,
}

impl UnreadCounts {
    /// Create an empty set of counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one unread message from `sender`.
    pub fn increment(&mut self, sender: UserId) {
        *self.counts.entry(sender).or_insert(0) += 1;
    }

    /// Clear the count for `sender` (opening their conversation).
    pub fn clear(&mut self, sender: UserId) {
        self.counts.remove(&sender);
    }

    /// Unread count for `sender`.
    pub fn count(&self, sender: UserId) -> u64 {
        self.counts.get(&sender).copied().unwrap_or(0)
    }

    /// Whether no sender has unread messages.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Merge a restored snapshot into the live counts, keeping the
    /// larger count per sender.
    pub fn merge(&mut self, snapshot: &UnreadCounts) {
        for (sender, count) in &snapshot.counts {
            let entry = self.counts.entry(*sender).or_insert(0);
            *entry = (*entry).max(*count);
        }
    }
}
