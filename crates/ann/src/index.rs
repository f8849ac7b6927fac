use std::path::{Path, PathBuf};

use lyncup_core::{Result, UserId};

use crate::artifact::AnnIndexArtifact;

/// Read-only handle onto a persisted [`AnnIndexArtifact`].
///
/// Scheduler ticks load one of these per cluster per tick (or reuse a
/// cached handle keyed by file mtime) and never mutate it; rebuilding the
/// index is the embedding job's job, not this crate's.
pub struct AnnIndex {
    path: PathBuf,
    artifact: AnnIndexArtifact,
}

impl AnnIndex {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let artifact = AnnIndexArtifact::load(&path)?;
        Ok(Self { path, artifact })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.artifact.has_user(user_id)
    }

    pub fn slot(&self, user_id: UserId) -> Option<u32> {
        self.artifact.slot_of(user_id)
    }

    pub fn user(&self, slot: u32) -> Option<UserId> {
        self.artifact.user_of(slot)
    }

    pub fn len(&self) -> usize {
        self.artifact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifact.is_empty()
    }

    /// Approximate top-`k` nearest neighbours of `user_id`, nearest first.
    /// Includes `user_id` itself when indexed; callers strip the self-match.
    pub fn top_k(&self, user_id: UserId, k: usize) -> Result<Vec<(UserId, f32)>> {
        self.artifact.top_k(user_id, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::UserVector;
    use rand::SeedableRng;

    #[test]
    fn load_then_query_matches_freshly_built_artifact() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let users: Vec<UserVector> = (0..20)
            .map(|i| UserVector::new(UserId(i), vec![i as f32, (i * 2) as f32]))
            .collect();
        let artifact = AnnIndexArtifact::build(users, 5, &mut rng).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let ann_path = dir.path().join("cluster_global.ann");
        let map_path = dir.path().join("global_map.json");
        artifact.save_atomic(&ann_path, &map_path).unwrap();

        let index = AnnIndex::load(&ann_path).unwrap();
        assert!(index.has_user(UserId(3)));
        assert_eq!(index.user(index.slot(UserId(3)).unwrap()), Some(UserId(3)));
        assert!(index.top_k(UserId(3), 5).unwrap().len() <= 6);
    }
}
