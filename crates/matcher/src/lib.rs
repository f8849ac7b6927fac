//! Turns waiting users into matched groups.
//!
//! `run_batch` does not allocate room ids — that is the dispatcher's job,
//! done only after a group is final — so groups here are plain user id
//! lists, not [`lyncup_core::MatchedGroup`].

use std::collections::HashMap;

use lyncup_ann::AnnIndex;
use lyncup_core::config::MatchingConfig;
use lyncup_core::{BucketName, UserId, GLOBAL_BUCKET, LEFTOVER_BUCKET};
use lyncup_queue::QueueManager;
use rand::Rng;

pub type Group = Vec<UserId>;

/// Run one matching pass over every bucket except `"leftover"`, then drain
/// `"leftover"` itself.
///
/// When `index` is `None` (the ANN artifact failed to load), every
/// non-leftover bucket is skipped — sized but empty — while the leftover
/// drain still runs.
pub fn run_batch<R: Rng>(
    queue: &mut QueueManager<R>,
    index: Option<&AnnIndex>,
    params: &MatchingConfig,
) -> HashMap<BucketName, Vec<Group>> {
    let mut result: HashMap<BucketName, Vec<Group>> = HashMap::new();

    match index {
        Some(index) => {
            let mut bucket_names: Vec<String> = queue
                .buckets()
                .into_iter()
                .filter(|b| *b != LEFTOVER_BUCKET)
                .map(str::to_string)
                .collect();
            bucket_names.sort();

            for bucket in bucket_names {
                let groups = match_in_cluster(queue, index, &bucket, params);
                if !groups.is_empty() {
                    result.insert(bucket, groups);
                }
            }
        }
        None => {
            tracing::warn!("ann index unavailable this tick, skipping non-leftover matching");
        }
    }

    let leftover_groups = drain_leftover(queue);
    if !leftover_groups.is_empty() {
        result.insert(LEFTOVER_BUCKET.to_string(), leftover_groups);
    }

    result
}

/// One bucket's worth of matching.
fn match_in_cluster<R: Rng>(
    queue: &mut QueueManager<R>,
    index: &AnnIndex,
    bucket: &str,
    params: &MatchingConfig,
) -> Vec<Group> {
    let mut groups = Vec::new();
    let mut processed = 0;

    while queue.size(bucket) > 0 && processed < params.batch_size {
        let seed = match queue.pop_random(bucket) {
            Some(entry) => entry,
            None => break,
        };
        processed += 1;

        if !index.has_user(seed.user_id) {
            queue.add(LEFTOVER_BUCKET, seed.user_id);
            continue;
        }

        let neighbors = match index.top_k(seed.user_id, params.top_k) {
            Ok(n) => n,
            Err(_) => {
                queue.add(LEFTOVER_BUCKET, seed.user_id);
                continue;
            }
        };

        let mut chosen = Vec::new();
        for (candidate, _distance) in neighbors {
            if chosen.len() >= params.max_group.saturating_sub(1) {
                break;
            }
            if candidate == seed.user_id {
                continue;
            }
            // Skip silently if another seed already matched this candidate
            // out of the bucket earlier in the same tick.
            if let Some(entry) = queue.remove_by_id(bucket, candidate) {
                chosen.push(entry.user_id);
            }
        }

        if chosen.len() + 1 < params.min_group {
            queue.add(LEFTOVER_BUCKET, seed.user_id);
            for uid in chosen {
                queue.add(LEFTOVER_BUCKET, uid);
            }
            continue;
        }

        let mut group = vec![seed.user_id];
        group.extend(chosen);
        groups.push(group);
    }

    groups
}

/// Drain `"leftover"` in chunks of four. A trailing chunk of 2-3 users is
/// emitted as its own terminal group. A trailing chunk of exactly 1 is
/// merged into the preceding full chunk (producing a group of 5) rather
/// than emitted alone; if there is no preceding chunk in this drain (the
/// bucket held only that one user), it is held over to the next tick
/// instead — groups of size 1 are never emitted.
fn drain_leftover<R: Rng>(queue: &mut QueueManager<R>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut current: Group = Vec::new();

    while let Some(entry) = queue.pop_random(LEFTOVER_BUCKET) {
        current.push(entry.user_id);
        if current.len() == 4 {
            groups.push(std::mem::take(&mut current));
        }
    }

    match current.len() {
        0 => {}
        1 => {
            if let Some(last) = groups.last_mut() {
                last.push(current[0]);
            } else {
                queue.add(LEFTOVER_BUCKET, current[0]);
            }
        }
        _ => groups.push(current),
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyncup_ann::{AnnIndexArtifact, UserVector};
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn default_params() -> MatchingConfig {
        MatchingConfig::default()
    }

    fn ann_index_over(ids: &[i64]) -> (tempfile::TempDir, AnnIndex) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let users: Vec<UserVector> = ids
            .iter()
            .map(|&id| UserVector::new(UserId(id), vec![id as f32, (id * 2) as f32]))
            .collect();
        let artifact = AnnIndexArtifact::build(users, 4, &mut rng).unwrap();
        let dir = tempdir().unwrap();
        let ann_path = dir.path().join("cluster_global.ann");
        let map_path = dir.path().join("global_map.json");
        artifact.save_atomic(&ann_path, &map_path).unwrap();
        let index = AnnIndex::load(&ann_path).unwrap();
        (dir, index)
    }

    #[test]
    fn cold_start_users_all_land_in_leftover_and_group_of_three() {
        let mut queue = QueueManager::with_rng(rand::rngs::StdRng::seed_from_u64(1));
        for i in 1..=3 {
            queue.add(GLOBAL_BUCKET, UserId(i));
        }
        // Empty index: nobody is a known user, so everyone is cold-start.
        let (_dir, index) = ann_index_over(&[999]);
        let groups = run_batch(&mut queue, Some(&index), &default_params());
        let leftover = groups.get(LEFTOVER_BUCKET).expect("one leftover group");
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover[0].len(), 3);
    }

    #[test]
    fn four_cold_start_users_form_one_group_of_four() {
        let mut queue = QueueManager::with_rng(rand::rngs::StdRng::seed_from_u64(2));
        for i in 1..=4 {
            queue.add(GLOBAL_BUCKET, UserId(i));
        }
        let (_dir, index) = ann_index_over(&[999]);
        let groups = run_batch(&mut queue, Some(&index), &default_params());
        let leftover = groups.get(LEFTOVER_BUCKET).expect("one leftover group");
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover[0].len(), 4);
    }

    #[test]
    fn five_cold_start_users_merge_into_one_group_of_five() {
        let mut queue = QueueManager::with_rng(rand::rngs::StdRng::seed_from_u64(3));
        for i in 1..=5 {
            queue.add(GLOBAL_BUCKET, UserId(i));
        }
        let (_dir, index) = ann_index_over(&[999]);
        let groups = run_batch(&mut queue, Some(&index), &default_params());
        let leftover = groups.get(LEFTOVER_BUCKET).expect("one leftover group");
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover[0].len(), 5);
    }

    #[test]
    fn lone_leftover_user_is_held_over_instead_of_emitted() {
        let mut queue = QueueManager::with_rng(rand::rngs::StdRng::seed_from_u64(4));
        queue.add(GLOBAL_BUCKET, UserId(1));
        let (_dir, index) = ann_index_over(&[999]);
        let groups = run_batch(&mut queue, Some(&index), &default_params());
        assert!(groups.get(LEFTOVER_BUCKET).is_none());
        assert_eq!(queue.size(LEFTOVER_BUCKET), 1);
    }

    #[test]
    fn six_leftover_users_split_into_four_and_two() {
        let mut queue = QueueManager::with_rng(rand::rngs::StdRng::seed_from_u64(5));
        for i in 1..=6 {
            queue.add(LEFTOVER_BUCKET, UserId(i));
        }
        let groups = run_batch(&mut queue, None, &default_params());
        let leftover = groups.get(LEFTOVER_BUCKET).expect("two leftover groups");
        let mut sizes: Vec<usize> = leftover.iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![2, 4]);
    }

    #[test]
    fn missing_index_skips_non_leftover_buckets_but_still_drains_leftover() {
        let mut queue = QueueManager::with_rng(rand::rngs::StdRng::seed_from_u64(6));
        queue.add(GLOBAL_BUCKET, UserId(1));
        queue.add(GLOBAL_BUCKET, UserId(2));
        queue.add(GLOBAL_BUCKET, UserId(3));
        for i in 10..=13 {
            queue.add(LEFTOVER_BUCKET, UserId(i));
        }
        let groups = run_batch(&mut queue, None, &default_params());
        assert!(groups.get(GLOBAL_BUCKET).is_none());
        assert_eq!(queue.size(GLOBAL_BUCKET), 3);
        let leftover = groups.get(LEFTOVER_BUCKET).unwrap();
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover[0].len(), 4);
    }
}
