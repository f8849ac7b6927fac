mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lyncup_ann::AnnIndex;
use lyncup_core::config::EmbeddingConfig;
use lyncup_core::{Config, Edge, UserId};
use lyncup_embed::EmbeddingBuilder;
use lyncup_likes::{LikesSource, PgLikesSource};
use serde::Deserialize;
use tracing::{info, warn};

use crate::cli::{BuildIndexArgs, Cli, Command, InspectArgs};

#[tokio::main]
async fn main() -> Result<()> {
    lyncup_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::BuildIndex(args) => build_index(args).await,
        Command::Inspect(args) => inspect(args).await,
    }
}

/// Raw edge shape for the `--likes-file` escape hatch, decoupled from
/// `lyncup_core::Edge`'s wire format so the CLI's file format doesn't break
/// if that one changes.
#[derive(Debug, Deserialize)]
struct RawEdge {
    from: i64,
    to: i64,
    weight: f64,
}

async fn load_likes(args: &BuildIndexArgs, config: &Config) -> Result<Vec<Edge>> {
    match &args.likes_file {
        Some(path) => {
            info!(path = %path.display(), "reading likes from file");
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read likes file {}", path.display()))?;
            let raw: Vec<RawEdge> = serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse likes file {}", path.display()))?;
            Ok(raw
                .into_iter()
                .map(|e| Edge::new(UserId(e.from), UserId(e.to), e.weight))
                .collect())
        }
        None => {
            info!(url = %config.postgres.url, "reading likes from postgres");
            let source = PgLikesSource::connect(&config.postgres.url)
                .await
                .context("failed to connect to postgres")?;
            Ok(source.load_all_likes().await?)
        }
    }
}

async fn build_index(args: BuildIndexArgs) -> Result<()> {
    let config = Config::from_env();

    let embedding = EmbeddingConfig {
        dimensions: args.dimensions.unwrap_or(config.embedding.dimensions),
        walk_length: args.walk_length.unwrap_or(config.embedding.walk_length),
        walks_per_node: args.walks_per_node.unwrap_or(config.embedding.walks_per_node),
        return_param: config.embedding.return_param,
        in_out_param: config.embedding.in_out_param,
        window: config.embedding.window,
        num_trees: args.num_trees.unwrap_or(config.embedding.num_trees),
        reciprocal_weight: args.reciprocal_weight.unwrap_or(config.embedding.reciprocal_weight),
    };

    let likes = load_likes(&args, &config).await?;
    info!(edges = likes.len(), "loaded likes");

    let builder = EmbeddingBuilder::default();
    let artifact = builder.build(&likes, &embedding)?;
    let Some(artifact) = artifact else {
        warn!("no likes available, nothing to build");
        return Ok(());
    };

    let out_dir = args.out_dir.unwrap_or(config.storage.base_dir.clone());
    let ann_path = out_dir.join("cluster_global.ann");
    let map_path = out_dir.join("global_map.json");
    artifact.save_atomic(&ann_path, &map_path)?;

    info!(
        ann_path = %ann_path.display(),
        map_path = %map_path.display(),
        users = artifact.len(),
        "index written"
    );
    Ok(())
}

async fn inspect(args: InspectArgs) -> Result<()> {
    let config = Config::from_env();
    let ann_path: PathBuf = args.ann_path.unwrap_or(config.storage.ann_file());

    let index = AnnIndex::load(&ann_path)
        .with_context(|| format!("failed to load ann index at {}", ann_path.display()))?;

    println!("index: {}", ann_path.display());
    println!("users indexed: {}", index.len());

    if let Some(user_id) = args.user_id {
        let user_id = UserId(user_id);
        if !index.has_user(user_id) {
            println!("user {user_id} is not present in this index");
            return Ok(());
        }
        let neighbours = index.top_k(user_id, args.k)?;
        println!("top-{} neighbours of {user_id} (including self):", args.k);
        for (uid, dist) in neighbours {
            println!("  {uid}\tdistance={dist:.4}");
        }
    }

    Ok(())
}
