use std::collections::HashMap;

use lyncup_core::{BucketName, QueueEntry, UserId, GLOBAL_BUCKET, LEFTOVER_BUCKET};
use rand::rngs::ThreadRng;
use rand::Rng;

use crate::bucket::Bucket;

/// In-process bucketed waiting-user membership.
///
/// Owned exclusively by the scheduler tick that creates it — there is no
/// cross-thread access during a tick, so no internal locking is needed.
pub struct QueueManager<R: Rng = ThreadRng> {
    buckets: HashMap<BucketName, Bucket>,
    rng: R,
}

impl QueueManager<ThreadRng> {
    /// Create a fresh manager. `"global"` and `"leftover"` always exist.
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for QueueManager<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> QueueManager<R> {
    /// Create a manager with an injected RNG (deterministic tests).
    pub fn with_rng(rng: R) -> Self {
        let mut buckets = HashMap::new();
        buckets.insert(GLOBAL_BUCKET.to_string(), Bucket::new());
        buckets.insert(LEFTOVER_BUCKET.to_string(), Bucket::new());
        Self { buckets, rng }
    }

    /// Creates the bucket if absent; no-op if `user_id` is already present.
    pub fn add(&mut self, bucket: &str, user_id: UserId) {
        self.buckets
            .entry(bucket.to_string())
            .or_insert_with(Bucket::new)
            .add(QueueEntry::new(user_id));
    }

    pub fn remove_by_id(&mut self, bucket: &str, user_id: UserId) -> Option<QueueEntry> {
        self.buckets.get_mut(bucket)?.remove_by_id(user_id)
    }

    pub fn pop_random(&mut self, bucket: &str) -> Option<QueueEntry> {
        let entry = self.buckets.get_mut(bucket)?.pop_random(&mut self.rng);
        entry
    }

    pub fn size(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map(Bucket::len).unwrap_or(0)
    }

    /// Always contains `"global"` and `"leftover"`.
    pub fn buckets(&self) -> Vec<&str> {
        self.buckets.keys().map(String::as_str).collect()
    }
}
