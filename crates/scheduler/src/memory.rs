//! In-memory fakes for the five capability traits, used by dispatcher
//! tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lyncup_core::{LyncupError, Result, RoomAssignment, RoomId, UserId};

use crate::traits::{LockToken, PushBus, RoomCounter, SchedulingLock, WaitingSet};

#[derive(Debug, Default)]
pub struct InMemoryWaitingSet {
    members: Mutex<HashSet<String>>,
}

impl InMemoryWaitingSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let members = ids.into_iter().map(|id| id.to_string()).collect();
        Self {
            members: Mutex::new(members),
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.members.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl WaitingSet for InMemoryWaitingSet {
    async fn members(&self) -> Result<Vec<String>> {
        Ok(self.members.lock().unwrap().iter().cloned().collect())
    }

    async fn remove(&self, ids: &[UserId]) -> Result<usize> {
        let mut guard = self.members.lock().unwrap();
        let mut removed = 0;
        for id in ids {
            if guard.remove(&id.to_string()) {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRoomCounter {
    value: Mutex<i64>,
}

#[async_trait]
impl RoomCounter for InMemoryRoomCounter {
    async fn increment(&self) -> Result<RoomId> {
        let mut guard = self.value.lock().unwrap();
        *guard += 1;
        Ok(RoomId(*guard))
    }
}

/// Held-by-value set-if-absent lock, mirroring the Redis `SET NX` semantics
/// without a TTL timer (tests that need TTL expiry drive it explicitly).
#[derive(Debug, Default)]
pub struct InMemorySchedulingLock {
    holder: Mutex<Option<String>>,
}

#[async_trait]
impl SchedulingLock for InMemorySchedulingLock {
    async fn try_acquire(&self, _ttl: Duration) -> Result<Option<LockToken>> {
        let mut guard = self.holder.lock().unwrap();
        if guard.is_some() {
            return Ok(None);
        }
        let token = uuid::Uuid::new_v4().to_string();
        *guard = Some(token.clone());
        Ok(Some(LockToken(token)))
    }

    async fn release(&self, token: LockToken) -> Result<()> {
        let mut guard = self.holder.lock().unwrap();
        if guard.as_deref() == Some(token.0.as_str()) {
            *guard = None;
        }
        Ok(())
    }
}

/// Records every publish; can be told to fail for specific users so tests
/// can exercise per-user publish failure.
#[derive(Debug, Default)]
pub struct InMemoryPushBus {
    published: Mutex<Vec<(UserId, RoomId)>>,
    failing_users: Mutex<HashSet<UserId>>,
}

impl InMemoryPushBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, user_id: UserId) {
        self.failing_users.lock().unwrap().insert(user_id);
    }

    pub fn published(&self) -> Vec<(UserId, RoomId)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushBus for InMemoryPushBus {
    async fn publish(&self, user_id: UserId, assignment: &RoomAssignment) -> Result<()> {
        if self.failing_users.lock().unwrap().contains(&user_id) {
            return Err(LyncupError::PublishFailure(user_id.to_string()));
        }
        self.published.lock().unwrap().push((user_id, assignment.room_id));
        Ok(())
    }
}
