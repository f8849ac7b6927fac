use lyncup_core::Config;
use lyncup_likes::IdentityCatalog;
use lyncup_scheduler::{RedisPushBus, RedisStore};

use crate::index_cache::IndexCache;

/// Shared application state: config, the Redis-backed shared-state
/// collaborators, the identity catalog, and the hot-reloadable ANN index
/// cache.
pub struct AppState {
    pub config: Config,
    /// Implements `WaitingSet`, `RoomCounter`, and `SchedulingLock` all at
    /// once — one Redis connection surface for the tick.
    pub redis: RedisStore,
    /// A second handle onto the same Redis deployment, used for per-topic
    /// pub/sub subscriptions from WebSocket connections (never touched by
    /// the tick itself).
    pub redis_client: redis::Client,
    pub push_bus: RedisPushBus,
    pub identity: Box<dyn IdentityCatalog>,
    pub index_cache: IndexCache,
}
