use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use lyncup_core::{LyncupError, Result, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::forest::Forest;

/// A trained embedding vector for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserVector {
    pub user_id: UserId,
    pub vector: Vec<f32>,
}

impl UserVector {
    pub fn new(user_id: UserId, vector: Vec<f32>) -> Self {
        Self { user_id, vector }
    }
}

/// Distance metric the forest was built for. Angular (cosine) is the only
/// one this crate implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Angular,
}

/// The full persisted nearest-neighbour index: vectors, slot bookkeeping,
/// and the built forest, as one binary artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnIndexArtifact {
    vectors: Vec<Vec<f32>>,
    slot_of_user: HashMap<UserId, u32>,
    user_of_slot: HashMap<u32, UserId>,
    dimensions: usize,
    metric: Metric,
    forest: Forest,
}

impl AnnIndexArtifact {
    /// Assign dense slots to `users` in the given order, build the forest,
    /// and assemble the artifact. Fails if `users` is empty or vectors
    /// disagree on dimensionality.
    pub fn build(users: Vec<UserVector>, num_trees: usize, rng: &mut impl rand::Rng) -> Result<Self> {
        if users.is_empty() {
            return Err(LyncupError::Invariant(
                "cannot build an ANN index over zero vectors".into(),
            ));
        }
        let dimensions = users[0].vector.len();
        if users.iter().any(|u| u.vector.len() != dimensions) {
            return Err(LyncupError::Invariant(
                "all embedding vectors must share one dimensionality".into(),
            ));
        }

        let mut vectors = Vec::with_capacity(users.len());
        let mut slot_of_user = HashMap::with_capacity(users.len());
        let mut user_of_slot = HashMap::with_capacity(users.len());
        for (slot, user) in users.into_iter().enumerate() {
            let slot = slot as u32;
            slot_of_user.insert(user.user_id, slot);
            user_of_slot.insert(slot, user.user_id);
            vectors.push(user.vector);
        }

        let forest = Forest::build(&vectors, num_trees, rng);

        Ok(Self {
            vectors,
            slot_of_user,
            user_of_slot,
            dimensions,
            metric: Metric::Angular,
            forest,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn num_trees(&self) -> usize {
        self.forest.num_trees()
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.slot_of_user.contains_key(&user_id)
    }

    pub fn slot_of(&self, user_id: UserId) -> Option<u32> {
        self.slot_of_user.get(&user_id).copied()
    }

    pub fn user_of(&self, slot: u32) -> Option<UserId> {
        self.user_of_slot.get(&slot).copied()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Approximate top-`k` nearest neighbours of `user_id` by angular
    /// distance, including `user_id` itself when it is indexed — callers,
    /// not this method, are responsible for stripping the self-match.
    pub fn top_k(&self, user_id: UserId, k: usize) -> Result<Vec<(UserId, f32)>> {
        let slot = self
            .slot_of_user
            .get(&user_id)
            .copied()
            .ok_or_else(|| LyncupError::Invariant(format!("user {user_id} is not indexed")))?;
        let query = &self.vectors[slot as usize];

        let mut candidates = self.forest.candidates(query);
        if candidates.is_empty() {
            candidates.push(slot);
        }

        let mut scored: Vec<(UserId, f32)> = candidates
            .into_iter()
            .filter_map(|c| {
                let uid = self.user_of_slot.get(&c)?;
                let dist = crate::forest::angular_distance(query, &self.vectors[c as usize]);
                Some((*uid, dist))
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k + 1);
        Ok(scored)
    }

    /// Write the binary artifact and the JSON slot-map sidecar atomically
    /// (temp file + rename) so a reader never observes a half-written
    /// index file pair.
    pub fn save_atomic(&self, ann_path: &Path, map_path: &Path) -> Result<()> {
        let encoded = rmp_serde::to_vec(self)
            .map_err(|e| LyncupError::Serialize(format!("ann artifact encode failed: {e}")))?;
        atomic_write(ann_path, &encoded)?;

        let user_index_map: HashMap<String, u32> = self
            .slot_of_user
            .iter()
            .map(|(uid, slot)| (uid.to_string(), *slot))
            .collect();
        let index_user_map: HashMap<String, i64> = self
            .user_of_slot
            .iter()
            .map(|(slot, uid)| (slot.to_string(), uid.0))
            .collect();
        let sidecar = json!({
            "user_index_map": user_index_map,
            "index_user_map": index_user_map,
            "embed_dimensions": self.dimensions,
        });
        let sidecar_bytes = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| LyncupError::Serialize(format!("map sidecar encode failed: {e}")))?;
        atomic_write(map_path, &sidecar_bytes)?;

        Ok(())
    }

    pub fn load(ann_path: &Path) -> Result<Self> {
        let bytes = fs::read(ann_path)?;
        rmp_serde::from_slice(&bytes)
            .map_err(|e| LyncupError::Malformed(format!("ann artifact decode failed: {e}")))
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let tmp_path: PathBuf = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact")
    ));
    {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(bytes)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn sample_users(n: i64) -> Vec<UserVector> {
        (0..n)
            .map(|i| {
                let angle = i as f32;
                UserVector::new(UserId(i), vec![angle.cos(), angle.sin()])
            })
            .collect()
    }

    #[test]
    fn build_rejects_empty_vector_set() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let result = AnnIndexArtifact::build(Vec::new(), 4, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn build_rejects_mismatched_dimensions() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let users = vec![
            UserVector::new(UserId(1), vec![1.0, 0.0]),
            UserVector::new(UserId(2), vec![1.0, 0.0, 0.0]),
        ];
        assert!(AnnIndexArtifact::build(users, 4, &mut rng).is_err());
    }

    #[test]
    fn top_k_always_includes_self() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let artifact = AnnIndexArtifact::build(sample_users(30), 6, &mut rng).unwrap();
        let result = artifact.top_k(UserId(5), 10).unwrap();
        assert!(result.iter().any(|(uid, _)| *uid == UserId(5)));
    }

    #[test]
    fn save_then_load_roundtrip_preserves_top_k() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let artifact = AnnIndexArtifact::build(sample_users(30), 6, &mut rng).unwrap();
        let before = artifact.top_k(UserId(5), 10).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let ann_path = dir.path().join("cluster_global.ann");
        let map_path = dir.path().join("global_map.json");
        artifact.save_atomic(&ann_path, &map_path).unwrap();

        let reloaded = AnnIndexArtifact::load(&ann_path).unwrap();
        let after = reloaded.top_k(UserId(5), 10).unwrap();
        assert_eq!(before, after);

        let sidecar: serde_json::Value =
            serde_json::from_slice(&fs::read(&map_path).unwrap()).unwrap();
        assert_eq!(sidecar["embed_dimensions"], 2);
        assert!(sidecar["user_index_map"]["5"].is_number());
    }
}
