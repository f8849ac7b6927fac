use std::sync::Arc;
use std::time::Duration;

use lyncup_scheduler::TickParams;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::state::AppState;

/// Drive the periodic tick on a `tokio::time::interval`. Runs until the
/// process exits; a failed tick just logs and waits for the next
/// interval.
pub async fn run(state: Arc<AppState>) {
    let period = Duration::from_secs(state.config.scheduler.period_secs.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(period_secs = period.as_secs(), "tick loop started");

    loop {
        interval.tick().await;
        run_one_tick(&state).await;
    }
}

async fn run_one_tick(state: &Arc<AppState>) {
    // Gate on index availability before doing anything else, including
    // acquiring the scheduling lock.
    if !state.index_cache.artifact_exists() {
        info!("tick: no ANN artifact on disk yet, skipping");
        return;
    }

    let index = state.index_cache.current().await;
    let params = TickParams {
        lock_ttl: Duration::from_secs(state.config.scheduler.lock_ttl_secs),
        matching: state.config.matching,
    };

    let outcome = lyncup_scheduler::tick(
        &state.redis,
        &state.redis,
        &state.redis,
        &state.push_bus,
        state.identity.as_ref(),
        index.as_deref(),
        &params,
    )
    .await;

    match outcome {
        Ok(outcome) => info!(?outcome, "tick complete"),
        Err(e) => error!(error = %e, "tick failed"),
    }
}
