use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RoomId, UserId};

/// A single weighted directed like, as read from the relational `likes`
/// source: `from != to`, duplicates are pre-aggregated by the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: UserId,
    pub to: UserId,
    pub weight: f64,
}

impl Edge {
    pub fn new(from: UserId, to: UserId, weight: f64) -> Self {
        Self { from, to, weight }
    }
}

/// A user waiting to be matched. Identity is `user_id` alone — two entries
/// with the same id are equal regardless of `joined_at`, matching the
/// source's `UserEntry.__eq__`/`__hash__` override.
#[derive(Debug, Clone, Copy)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            joined_at: Utc::now(),
        }
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id
    }
}

impl Eq for QueueEntry {}

impl std::hash::Hash for QueueEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.user_id.hash(state);
    }
}

/// A group of 3–4 (occasionally 5, see the leftover-merge policy in
/// DESIGN.md) matched users, assigned a room id by the Dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedGroup {
    pub room_id: RoomId,
    pub members: Vec<UserId>,
}

impl MatchedGroup {
    pub fn new(room_id: RoomId, members: Vec<UserId>) -> Self {
        Self { room_id, members }
    }
}

/// The push message delivered to `user_queue_<user_id>` once a room is
/// allocated: `{"type":"send_room_id","room_id":<int>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomAssignment {
    #[serde(rename = "type")]
    pub kind: RoomAssignmentKind,
    pub room_id: RoomId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomAssignmentKind {
    SendRoomId,
}

impl RoomAssignment {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            kind: RoomAssignmentKind::SendRoomId,
            room_id,
        }
    }
}

/// Topic name a [`RoomAssignment`] is published to for a given user.
pub fn push_topic(user_id: UserId) -> String {
    format!("user_queue_{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_assignment_matches_wire_schema() {
        let msg = RoomAssignment::new(RoomId(42));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "send_room_id");
        assert_eq!(json["room_id"], 42);
    }

    #[test]
    fn push_topic_format() {
        assert_eq!(push_topic(UserId(7)), "user_queue_7");
    }

    #[test]
    fn queue_entry_equality_ignores_joined_at() {
        let a = QueueEntry::new(UserId(1));
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = QueueEntry::new(UserId(1));
        assert_eq!(a, b);
    }
}
