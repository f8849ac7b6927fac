use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load `.env` if present (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Top-level configuration surface: scheduler period, batch size, top-K,
/// min/max group size, reciprocal weight, embedding
/// dimensions, walks-per-node, walk length, number of trees, lock TTL,
/// base directory for artifacts, connection strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub embedding: EmbeddingConfig,
    pub matching: MatchingConfig,
    pub storage: StorageConfig,
    pub redis: RedisConfig,
    pub postgres: PostgresConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Build config from environment variables (call [`load_dotenv`] first).
    pub fn from_env() -> Self {
        Self {
            scheduler: SchedulerConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            matching: MatchingConfig::from_env(),
            storage: StorageConfig::from_env(),
            redis: RedisConfig::from_env(),
            postgres: PostgresConfig::from_env(),
            server: ServerConfig::from_env(),
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            period_secs = self.scheduler.period_secs,
            lock_ttl_secs = self.scheduler.lock_ttl_secs,
            batch_size = self.matching.batch_size,
            top_k = self.matching.top_k,
            base_dir = %self.storage.base_dir.display(),
            "lyncup config loaded"
        );
    }
}

/// Periodic tick cadence and the distributed scheduling lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between ticks.
    pub period_secs: u64,
    /// TTL of the `run_matching_algo_lock` advisory lock, in seconds.
    pub lock_ttl_secs: u64,
}

impl SchedulerConfig {
    fn from_env() -> Self {
        Self {
            period_secs: env_u64("LYNCUP_SCHEDULER_PERIOD_SECS", 5),
            lock_ttl_secs: env_u64("LYNCUP_LOCK_TTL_SECS", 60),
        }
    }
}

/// Parameters for [`EmbeddingBuilder`](../../lyncup_embed/index.html)
/// (dimensions, walk shape, reciprocal weight, tree count).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub dimensions: usize,
    pub walk_length: usize,
    pub walks_per_node: usize,
    pub return_param: f64,
    pub in_out_param: f64,
    pub window: usize,
    pub num_trees: usize,
    pub reciprocal_weight: f64,
}

impl EmbeddingConfig {
    fn from_env() -> Self {
        Self {
            dimensions: env_u32("LYNCUP_EMBED_DIMENSIONS", 128) as usize,
            walk_length: env_u32("LYNCUP_WALK_LENGTH", 10) as usize,
            walks_per_node: env_u32("LYNCUP_WALKS_PER_NODE", 20) as usize,
            return_param: env_f64("LYNCUP_RETURN_PARAM", 1.0),
            in_out_param: env_f64("LYNCUP_IN_OUT_PARAM", 1.0),
            window: env_u32("LYNCUP_WINDOW", 5) as usize,
            num_trees: env_u32("LYNCUP_NUM_TREES", 10) as usize,
            reciprocal_weight: env_f64("LYNCUP_RECIPROCAL_WEIGHT", 0.5),
        }
    }
}

/// Parameters for [`Matcher::run_batch`](../../lyncup_matcher/index.html).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub batch_size: usize,
    pub top_k: usize,
    pub min_group: usize,
    pub max_group: usize,
}

impl MatchingConfig {
    fn from_env() -> Self {
        Self {
            batch_size: env_u32("LYNCUP_BATCH_SIZE", 50) as usize,
            top_k: env_u32("LYNCUP_TOP_K", 50) as usize,
            min_group: env_u32("LYNCUP_MIN_GROUP", 3) as usize,
            max_group: env_u32("LYNCUP_MAX_GROUP", 4) as usize,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            top_k: 50,
            min_group: 3,
            max_group: 4,
        }
    }
}

/// Base directory for ANN artifact files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub base_dir: PathBuf,
}

impl StorageConfig {
    fn from_env() -> Self {
        Self {
            base_dir: PathBuf::from(env_or("LYNCUP_ANN_DIR", "data/ann")),
        }
    }

    pub fn ann_file(&self) -> PathBuf {
        self.base_dir.join("cluster_global.ann")
    }

    pub fn map_file(&self) -> PathBuf {
        self.base_dir.join("global_map.json")
    }
}

/// Connection info for the shared WaitingSet / RoomCounter / SchedulingLock
/// store, implemented over Redis — see `lyncup-scheduler`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    fn from_env() -> Self {
        Self {
            url: env_or("LYNCUP_REDIS_URL", "redis://127.0.0.1:6379"),
        }
    }
}

/// Connection info for the read-only likes/identity source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
}

impl PostgresConfig {
    fn from_env() -> Self {
        Self {
            url: env_or(
                "LYNCUP_DATABASE_URL",
                "postgres://localhost/lyncup",
            ),
        }
    }
}

/// HTTP/WebSocket server bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("LYNCUP_HOST", "0.0.0.0"),
            port: env_u32("LYNCUP_PORT", 8080) as u16,
        }
    }
}
