pub mod config;
pub mod error;
pub mod ids;
pub mod model;

pub use config::Config;
pub use error::{LyncupError, Result};
pub use ids::{BucketName, RoomId, UserId, GLOBAL_BUCKET, LEFTOVER_BUCKET};
pub use model::{push_topic, Edge, MatchedGroup, QueueEntry, RoomAssignment, RoomAssignmentKind};
