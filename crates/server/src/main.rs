mod health;
mod index_cache;
mod router;
mod state;
mod tick_loop;
mod ws;

use std::sync::Arc;

use lyncup_core::Config;
use lyncup_likes::{IdentityCatalog, InMemoryLikesSource, PgLikesSource};
use lyncup_scheduler::{RedisPushBus, RedisStore};
use tracing::{info, warn};

use crate::index_cache::IndexCache;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lyncup_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    config.log_summary();

    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let redis_store = RedisStore::open(&config.redis.url)?;
    let push_bus = RedisPushBus::new(redis_store.clone());

    let identity: Box<dyn IdentityCatalog> = match PgLikesSource::connect(&config.postgres.url).await {
        Ok(pg) => {
            info!("connected to postgres identity catalog");
            Box::new(pg)
        }
        Err(e) => {
            warn!(
                error = %e,
                "could not connect to postgres; falling back to an empty in-memory identity catalog \
                 (every waiting user will be filtered out until this is configured)"
            );
            Box::new(InMemoryLikesSource::default())
        }
    };

    let index_cache = IndexCache::new(config.storage.ann_file(), config.storage.map_file());

    let state = Arc::new(AppState {
        config: config.clone(),
        redis: redis_store,
        redis_client,
        push_bus,
        identity,
        index_cache,
    });

    tokio::spawn(tick_loop::run(state.clone()));

    let app = router::build_router(state.clone());
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "lyncup-server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
