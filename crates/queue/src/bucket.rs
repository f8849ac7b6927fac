use std::collections::HashMap;

use lyncup_core::{QueueEntry, UserId};
use rand::Rng;

/// A single named set of waiting users.
///
/// Backed by a dense `Vec` plus a position index so `remove_by_id` and
/// `pop_random` are both O(1) via swap-remove, while `pop_random` draws a
/// uniformly random slot instead of relying on hash-map iteration order
/// (which is deterministic per process and would make pop order
/// predictable and biased toward insertion order across runs).
#[derive(Debug, Default)]
pub struct Bucket {
    entries: Vec<QueueEntry>,
    positions: HashMap<UserId, usize>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` if not already present (identity by `user_id`). No-op
    /// if the user is already in this bucket.
    pub fn add(&mut self, entry: QueueEntry) {
        if self.positions.contains_key(&entry.user_id) {
            return;
        }
        self.positions.insert(entry.user_id, self.entries.len());
        self.entries.push(entry);
    }

    /// Remove and return the entry for `user_id`, if present.
    pub fn remove_by_id(&mut self, user_id: UserId) -> Option<QueueEntry> {
        let idx = self.positions.remove(&user_id)?;
        let removed = self.swap_remove_at(idx);
        Some(removed)
    }

    /// Remove and return some entry, chosen uniformly at random.
    pub fn pop_random(&mut self, rng: &mut impl Rng) -> Option<QueueEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.entries.len());
        let entry = self.swap_remove_at(idx);
        self.positions.remove(&entry.user_id);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.positions.contains_key(&user_id)
    }

    /// Swap-remove the entry at `idx`, fixing up the moved entry's recorded
    /// position. Caller is responsible for clearing `positions` for the
    /// removed user id (callers differ on timing: `remove_by_id` already
    /// popped it before calling this, `pop_random` needs it after).
    fn swap_remove_at(&mut self, idx: usize) -> QueueEntry {
        let removed = self.entries.swap_remove(idx);
        if let Some(moved) = self.entries.get(idx) {
            self.positions.insert(moved.user_id, idx);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove_leaves_bucket_empty() {
        let mut bucket = Bucket::new();
        bucket.add(QueueEntry::new(UserId(1)));
        assert_eq!(bucket.len(), 1);
        let removed = bucket.remove_by_id(UserId(1));
        assert!(removed.is_some());
        assert_eq!(bucket.len(), 0);
    }

    #[test]
    fn add_is_idempotent_for_same_user() {
        let mut bucket = Bucket::new();
        bucket.add(QueueEntry::new(UserId(1)));
        bucket.add(QueueEntry::new(UserId(1)));
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn remove_missing_user_returns_none() {
        let mut bucket = Bucket::new();
        assert!(bucket.remove_by_id(UserId(404)).is_none());
    }

    #[test]
    fn swap_remove_keeps_remaining_entries_addressable() {
        let mut bucket = Bucket::new();
        for i in 0..5 {
            bucket.add(QueueEntry::new(UserId(i)));
        }
        bucket.remove_by_id(UserId(2));
        for i in [0, 1, 3, 4] {
            assert!(bucket.contains(UserId(i)), "user {i} should still be addressable");
        }
        assert_eq!(bucket.len(), 4);
    }

    #[test]
    fn pop_random_drains_every_entry_exactly_once() {
        let mut bucket = Bucket::new();
        for i in 0..20 {
            bucket.add(QueueEntry::new(UserId(i)));
        }
        let mut rng = rand::thread_rng();
        let mut seen = std::collections::HashSet::new();
        while let Some(entry) = bucket.pop_random(&mut rng) {
            assert!(seen.insert(entry.user_id), "duplicate pop of {:?}", entry.user_id);
        }
        assert_eq!(seen.len(), 20);
    }
}
