use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lyncup_core::{Result, RoomAssignment, RoomId, UserId};

/// Shared set of waiting user ids, cross-process. All mutating access
/// during a tick happens while the
/// [`SchedulingLock`] is held.
#[async_trait]
pub trait WaitingSet: Send + Sync {
    /// Current members, as the raw strings the protocol stores them as.
    async fn members(&self) -> Result<Vec<String>>;

    /// Remove the given ids (batch), returning how many were actually
    /// present and removed.
    async fn remove(&self, ids: &[UserId]) -> Result<usize>;
}

/// Shared monotonic integer allocator (Redis key `last_room_id`). Safe
/// under concurrent increment by construction (atomic `INCR` in the Redis
/// implementation).
#[async_trait]
pub trait RoomCounter: Send + Sync {
    /// Atomically increment and return the new value. The first call
    /// after a fresh counter returns `1`.
    async fn increment(&self) -> Result<RoomId>;
}

/// Opaque proof of lock ownership, returned by [`SchedulingLock::try_acquire`]
/// and required by [`SchedulingLock::release`]. Carries the random value
/// written at acquire time so release can do a compare-and-delete instead
/// of blindly deleting a lock another holder may have since acquired after
/// this one's TTL expired under a slow worker.
#[derive(Debug, Clone)]
pub struct LockToken(pub(crate) String);

/// The cross-process advisory mutex serializing ticks (Redis key
/// `run_matching_algo_lock`).
#[async_trait]
pub trait SchedulingLock: Send + Sync {
    /// Attempt `setIfAbsent(lockKey, value, ttl)`. Returns `None` immediately
    /// if another worker holds the lock — this never blocks.
    async fn try_acquire(&self, ttl: Duration) -> Result<Option<LockToken>>;

    /// Release the lock. Guaranteed-on-all-paths is the caller's
    /// responsibility (see [`crate::dispatcher::tick`]); this method itself
    /// only needs to be safe to call once per successful acquire.
    async fn release(&self, token: LockToken) -> Result<()>;
}

/// Fan-out by topic `user_queue_<id>`. Exactly-once delivery is not
/// required — the Dispatcher's WaitingSet removal after a successful
/// publish is the idempotence boundary, not this trait.
#[async_trait]
pub trait PushBus: Send + Sync {
    async fn publish(&self, user_id: UserId, assignment: &RoomAssignment) -> Result<()>;
}

/// Wall-clock access, injected so tests can pin "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock, used in production wiring.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
