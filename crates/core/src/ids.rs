use std::fmt;

use serde::{Deserialize, Serialize};

/// A waiting user's identity. The engine never issues or validates these —
/// it trusts the id carried by an authenticated push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(v: i64) -> Self {
        UserId(v)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(UserId)
    }
}

/// A chat room identifier, allocated monotonically by [`crate::error`]-free
/// external storage (`RoomCounter`). The engine never reuses or reclaims ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub i64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RoomId {
    fn from(v: i64) -> Self {
        RoomId(v)
    }
}

/// Name of a [`crate::MatchedGroup`] bucket — `"global"`, `"leftover"`, or a
/// cluster-specific name when the index defines clusters.
pub type BucketName = String;

pub const GLOBAL_BUCKET: &str = "global";
pub const LEFTOVER_BUCKET: &str = "leftover";
