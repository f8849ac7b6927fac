use std::collections::HashSet;

use async_trait::async_trait;
use lyncup_core::{Edge, LyncupError, UserId};

use crate::{IdentityCatalog, LikesSource};

/// In-memory [`LikesSource`] / [`IdentityCatalog`] fake, used by tests and
/// by the CLI's `--likes-file` escape hatch.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLikesSource {
    edges: Vec<Edge>,
    known_users: HashSet<UserId>,
}

impl InMemoryLikesSource {
    pub fn new(edges: Vec<Edge>) -> Self {
        let known_users = edges.iter().flat_map(|e| [e.from, e.to]).collect();
        Self { edges, known_users }
    }

    /// Construct from edges and an explicit known-user set (for tests that
    /// need cold-start users present in identity but absent from the ANN
    /// index, i.e. no likes at all).
    pub fn with_known_users(edges: Vec<Edge>, known_users: impl IntoIterator<Item = UserId>) -> Self {
        let mut source = Self::new(edges);
        source.known_users.extend(known_users);
        source
    }
}

#[async_trait]
impl LikesSource for InMemoryLikesSource {
    async fn load_all_likes(&self) -> Result<Vec<Edge>, LyncupError> {
        Ok(self.edges.clone())
    }
}

#[async_trait]
impl IdentityCatalog for InMemoryLikesSource {
    async fn filter_known(&self, candidates: &[UserId]) -> Result<Vec<UserId>, LyncupError> {
        Ok(candidates
            .iter()
            .copied()
            .filter(|id| self.known_users.contains(id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_source_returns_empty_sequence() {
        let source = InMemoryLikesSource::default();
        assert!(source.load_all_likes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_known_keeps_only_known_ids() {
        let source = InMemoryLikesSource::new(vec![Edge::new(UserId(1), UserId(2), 5.0)]);
        let known = source
            .filter_known(&[UserId(1), UserId(2), UserId(99)])
            .await
            .unwrap();
        assert_eq!(known.len(), 2);
        assert!(known.contains(&UserId(1)));
        assert!(!known.contains(&UserId(99)));
    }
}
