//! Dispatcher/Scheduler: the periodic tick driving matching and
//! room-assignment delivery, plus the external-collaborator traits and
//! their Redis-backed and in-memory implementations.

mod dispatcher;
mod memory;
mod redis_impl;
mod traits;

pub use dispatcher::{tick, TickOutcome, TickParams};
pub use memory::{InMemoryPushBus, InMemoryRoomCounter, InMemorySchedulingLock, InMemoryWaitingSet};
pub use redis_impl::{RedisPushBus, RedisStore};
pub use traits::{Clock, LockToken, PushBus, RoomCounter, SchedulingLock, SystemClock, WaitingSet};
