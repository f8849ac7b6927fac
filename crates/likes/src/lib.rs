//! Read-only access to the `(user_from, user_to, like_count)` relation the
//! matching engine treats as an external collaborator.
//!
//! The engine never writes here — it is a boundary, not a store owned by
//! this crate.

mod memory;
mod pg;

pub use memory::InMemoryLikesSource;
pub use pg::PgLikesSource;

use async_trait::async_trait;
use lyncup_core::{Edge, LyncupError};

/// `loadAllLikes() -> sequence of Edge`. Returns an empty sequence when no
/// data exists. No ordering guarantee. Called only by the embedding builder.
#[async_trait]
pub trait LikesSource: Send + Sync {
    async fn load_all_likes(&self) -> Result<Vec<Edge>, LyncupError>;
}

/// `IdentityCatalog` — the boundary the Dispatcher uses to filter the
/// WaitingSet snapshot down to ids that are actually known users. Kept in
/// this crate because filtering by user existence shares the same
/// connection as the likes table.
#[async_trait]
pub trait IdentityCatalog: Send + Sync {
    /// Given a set of candidate ids, return only the ones that exist.
    async fn filter_known(
        &self,
        candidates: &[lyncup_core::UserId],
    ) -> Result<Vec<lyncup_core::UserId>, LyncupError>;
}
