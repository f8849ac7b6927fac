//! The periodic tick. `tick` is a free function generic over the five
//! capability traits plus a loaded (or absent) [`AnnIndex`], so it runs
//! unchanged against Redis-backed production wiring or in-memory fakes in
//! tests.
//!
//! Gating on index availability ("if no artifact files are present on disk,
//! log and return") is the caller's responsibility: `lyncup-server` checks
//! file existence before invoking `tick` at all, since artifact caching by
//! mtime lives there. `tick` itself only sees `index: Option<&AnnIndex>`,
//! where `None` covers both "no file yet" and "file present but failed to
//! decode" — the matcher's own failure semantics (skip non-leftover
//! matching, still drain leftover) apply either way (see DESIGN.md).

use std::time::Duration;

use lyncup_ann::AnnIndex;
use lyncup_core::config::MatchingConfig;
use lyncup_core::{LyncupError, MatchedGroup, Result, RoomAssignment, UserId, GLOBAL_BUCKET, LEFTOVER_BUCKET};
use lyncup_likes::IdentityCatalog;
use lyncup_queue::QueueManager;

use crate::traits::{PushBus, RoomCounter, SchedulingLock, WaitingSet};

/// What happened on a given tick — useful for logging and for tests that
/// assert on boundary behaviors without peeking at mocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another worker holds `run_matching_algo_lock`.
    LockNotAcquired,
    /// Fewer than two extant waiting users after identity filtering.
    InsufficientUsers,
    /// Ran to completion. Counts describe what actually happened.
    Completed {
        groups_emitted: usize,
        rooms_allocated: usize,
        users_removed: usize,
    },
}

pub struct TickParams {
    pub lock_ttl: Duration,
    pub matching: MatchingConfig,
}

/// Run one scheduling tick: acquire the lock, filter and match the waiting
/// set, allocate rooms, publish, and release the lock.
pub async fn tick<W, RC, L, P, I>(
    waiting_set: &W,
    room_counter: &RC,
    lock: &L,
    push_bus: &P,
    identity: &I,
    index: Option<&AnnIndex>,
    params: &TickParams,
) -> Result<TickOutcome>
where
    W: WaitingSet,
    RC: RoomCounter,
    L: SchedulingLock,
    P: PushBus,
    I: IdentityCatalog + ?Sized,
{
    // Step 2: acquire the scheduling lock.
    let token = match lock.try_acquire(params.lock_ttl).await? {
        Some(token) => token,
        None => {
            tracing::debug!("tick: lock held elsewhere, skipping");
            return Ok(TickOutcome::LockNotAcquired);
        }
    };

    // Everything from here runs under the lock. `result` is computed first
    // and the lock is released on every path afterwards, without relying
    // on async Drop.
    let result = run_under_lock(waiting_set, room_counter, push_bus, identity, index, params).await;

    if let Err(e) = lock.release(token).await {
        tracing::warn!(error = %e, "tick: failed to release scheduling lock");
    }

    result
}

async fn run_under_lock<W, RC, P, I>(
    waiting_set: &W,
    room_counter: &RC,
    push_bus: &P,
    identity: &I,
    index: Option<&AnnIndex>,
    params: &TickParams,
) -> Result<TickOutcome>
where
    W: WaitingSet,
    RC: RoomCounter,
    P: PushBus,
    I: IdentityCatalog + ?Sized,
{
    // Step 3: snapshot the waiting set, dropping malformed (non-integer) ids.
    let raw_members = waiting_set.members().await?;
    let mut candidates = Vec::with_capacity(raw_members.len());
    let mut malformed = 0;
    for raw in raw_members {
        match raw.parse::<i64>() {
            Ok(id) => candidates.push(UserId(id)),
            Err(_) => malformed += 1,
        }
    }
    if malformed > 0 {
        tracing::warn!(count = malformed, "tick: dropped malformed waiting-set entries");
    }

    // Step 4: filter to extant users.
    let retained = identity.filter_known(&candidates).await?;
    if retained.len() < 2 {
        tracing::debug!(retained = retained.len(), "tick: fewer than two extant waiting users");
        return Ok(TickOutcome::InsufficientUsers);
    }

    // Step 5: seed a fresh QueueManager.
    let mut queue = QueueManager::new();
    for &id in &retained {
        queue.add(GLOBAL_BUCKET, id);
    }

    // Step 6: run matching.
    let grouped = lyncup_matcher::run_batch(&mut queue, index, &params.matching);

    // Flatten in a stable order: bucket name, then emission order within
    // the bucket, so room ids are allocated in the order groups are
    // emitted within a tick.
    let mut bucket_names: Vec<&String> = grouped.keys().collect();
    bucket_names.sort();

    let mut groups_emitted = 0;
    let mut rooms_allocated = 0;
    let mut users_removed = 0;

    for bucket in bucket_names {
        for members in &grouped[bucket] {
            validate_group_size(bucket, members)?;

            // Step 7: allocate a room id.
            let room_id = room_counter.increment().await?;
            rooms_allocated += 1;
            let group = MatchedGroup::new(room_id, members.clone());
            groups_emitted += 1;

            // Step 8: publish to each member; soft-fail per user.
            let assignment = RoomAssignment::new(room_id);
            let mut delivered = Vec::with_capacity(group.members.len());
            for &user_id in &group.members {
                match push_bus.publish(user_id, &assignment).await {
                    Ok(()) => delivered.push(user_id),
                    Err(e) => {
                        tracing::warn!(
                            user_id = %user_id,
                            room_id = %room_id,
                            error = %e,
                            "tick: publish failed, user stays in waiting set"
                        );
                    }
                }
            }

            // Step 9: only successfully published users leave the waiting set.
            if !delivered.is_empty() {
                let removed = waiting_set.remove(&delivered).await?;
                users_removed += removed;
            }
        }
    }

    Ok(TickOutcome::Completed {
        groups_emitted,
        rooms_allocated,
        users_removed,
    })
}

/// Invariant check: every non-leftover group has 3-4 members. The leftover
/// bucket permits 2-4 normally, or 5 under the singleton-merge policy.
/// Violations are programming errors — `LyncupError::Invariant`, aborting
/// the tick (lock still releases, since `tick` always releases after
/// `run_under_lock` returns).
fn validate_group_size(bucket: &str, members: &[UserId]) -> Result<()> {
    let size = members.len();
    let valid = if bucket == LEFTOVER_BUCKET {
        (2..=5).contains(&size)
    } else {
        (3..=4).contains(&size)
    };
    if !valid {
        return Err(LyncupError::Invariant(format!(
            "bucket {bucket} emitted a group of size {size}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryPushBus, InMemoryRoomCounter, InMemorySchedulingLock, InMemoryWaitingSet};
    use lyncup_ann::{AnnIndexArtifact, UserVector};
    use lyncup_likes::InMemoryLikesSource;
    use rand::SeedableRng;

    fn params() -> TickParams {
        TickParams {
            lock_ttl: Duration::from_secs(60),
            matching: MatchingConfig::default(),
        }
    }

    #[tokio::test]
    async fn empty_waiting_set_mutates_nothing_and_emits_nothing() {
        let waiting = InMemoryWaitingSet::new(std::iter::empty());
        let rooms = InMemoryRoomCounter::default();
        let lock = InMemorySchedulingLock::default();
        let bus = InMemoryPushBus::new();
        let identity = InMemoryLikesSource::default();

        let outcome = tick(&waiting, &rooms, &lock, &bus, &identity, None, &params())
            .await
            .unwrap();

        assert_eq!(outcome, TickOutcome::InsufficientUsers);
        assert!(bus.published().is_empty());
        assert!(waiting.snapshot().is_empty());
    }

    #[tokio::test]
    async fn fewer_than_two_known_users_yields_no_groups() {
        // WaitingSet={100,101,102,103}, identity knows only {100,101}; no
        // ANN index yet. Two extant users are seeded into "global" but
        // never routed into "leftover" since match_in_cluster never runs
        // without an index — so nothing is emitted and the waiting set is
        // untouched.
        let waiting = InMemoryWaitingSet::new([100, 101, 102, 103]);
        let rooms = InMemoryRoomCounter::default();
        let lock = InMemorySchedulingLock::default();
        let bus = InMemoryPushBus::new();
        let identity = InMemoryLikesSource::with_known_users(vec![], [UserId(100), UserId(101)]);

        let outcome = tick(&waiting, &rooms, &lock, &bus, &identity, None, &params())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TickOutcome::Completed {
                groups_emitted: 0,
                rooms_allocated: 0,
                users_removed: 0,
            }
        );
        assert!(bus.published().is_empty());
        let mut remaining = waiting.snapshot();
        remaining.sort();
        assert_eq!(remaining, vec!["100", "101", "102", "103"]);
    }

    #[tokio::test]
    async fn lock_held_elsewhere_is_a_pure_no_op() {
        let waiting = InMemoryWaitingSet::new([1, 2, 3]);
        let rooms = InMemoryRoomCounter::default();
        let lock = InMemorySchedulingLock::default();
        let bus = InMemoryPushBus::new();
        let identity = InMemoryLikesSource::with_known_users(vec![], [UserId(1), UserId(2), UserId(3)]);

        // Pre-acquire the lock to simulate another worker holding it.
        let held = lock.try_acquire(Duration::from_secs(60)).await.unwrap().unwrap();

        let outcome = tick(&waiting, &rooms, &lock, &bus, &identity, None, &params())
            .await
            .unwrap();
        assert_eq!(outcome, TickOutcome::LockNotAcquired);
        assert_eq!(waiting.snapshot().len(), 3);

        lock.release(held).await.unwrap();
    }

    #[tokio::test]
    async fn cold_start_four_users_form_one_group_and_clear_the_waiting_set() {
        let waiting = InMemoryWaitingSet::new([1, 2, 3, 4]);
        let rooms = InMemoryRoomCounter::default();
        let lock = InMemorySchedulingLock::default();
        let bus = InMemoryPushBus::new();
        let identity =
            InMemoryLikesSource::with_known_users(vec![], [UserId(1), UserId(2), UserId(3), UserId(4)]);

        // Build a tiny ANN index that doesn't contain any of these users,
        // so all four are cold-start and land in "leftover".
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let artifact = AnnIndexArtifact::build(
            vec![UserVector::new(UserId(999), vec![1.0, 0.0])],
            2,
            &mut rng,
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let ann_path = dir.path().join("cluster_global.ann");
        let map_path = dir.path().join("global_map.json");
        artifact.save_atomic(&ann_path, &map_path).unwrap();
        let index = AnnIndex::load(&ann_path).unwrap();

        let outcome = tick(&waiting, &rooms, &lock, &bus, &identity, Some(&index), &params())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TickOutcome::Completed {
                groups_emitted: 1,
                rooms_allocated: 1,
                users_removed: 4,
            }
        );
        assert_eq!(bus.published().len(), 4);
        assert!(bus.published().iter().all(|(_, room)| room.0 == 1));
        assert!(waiting.snapshot().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_keeps_that_user_in_the_waiting_set() {
        let waiting = InMemoryWaitingSet::new([7, 8, 9, 10]);
        let rooms = InMemoryRoomCounter::default();
        let lock = InMemorySchedulingLock::default();
        let bus = InMemoryPushBus::new();
        bus.fail_for(UserId(9));
        let identity = InMemoryLikesSource::with_known_users(
            vec![],
            [UserId(7), UserId(8), UserId(9), UserId(10)],
        );

        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let artifact =
            AnnIndexArtifact::build(vec![UserVector::new(UserId(999), vec![1.0, 0.0])], 2, &mut rng)
                .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let ann_path = dir.path().join("cluster_global.ann");
        let map_path = dir.path().join("global_map.json");
        artifact.save_atomic(&ann_path, &map_path).unwrap();
        let index = AnnIndex::load(&ann_path).unwrap();

        let outcome = tick(&waiting, &rooms, &lock, &bus, &identity, Some(&index), &params())
            .await
            .unwrap();

        match outcome {
            TickOutcome::Completed { users_removed, .. } => assert_eq!(users_removed, 3),
            other => panic!("expected Completed, got {other:?}"),
        }
        let mut remaining = waiting.snapshot();
        remaining.sort();
        assert_eq!(remaining, vec!["9"]);
    }

    #[tokio::test]
    async fn room_ids_allocated_strictly_increase_across_ticks() {
        let rooms = InMemoryRoomCounter::default();
        let first = rooms.increment().await.unwrap();
        let second = rooms.increment().await.unwrap();
        assert_eq!(first.0, 1);
        assert_eq!(second.0, 2);
        assert!(second.0 > first.0);
    }
}
