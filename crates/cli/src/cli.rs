use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Offline tooling for the LyncUp matching core: build an ANN index from
/// likes data, and inspect a persisted index.
#[derive(Parser, Debug)]
#[command(name = "lyncup-cli", about = "Offline embedding build and ANN index inspection")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the offline embedding-build job and atomically persist a fresh
    /// `cluster_global.ann` / `global_map.json` pair.
    BuildIndex(BuildIndexArgs),
    /// Load a persisted ANN index and print its contents, or query one
    /// user's approximate nearest neighbours.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct BuildIndexArgs {
    /// JSON file of `[{"from":..,"to":..,"weight":..}, ...]` edges, bypassing
    /// Postgres entirely.
    #[arg(long)]
    pub likes_file: Option<PathBuf>,

    /// Base directory to write `cluster_global.ann` / `global_map.json` into.
    /// Defaults to `LYNCUP_ANN_DIR` / `data/ann`.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Embedding dimensions (default from config: 128).
    #[arg(long)]
    pub dimensions: Option<usize>,

    /// Random walks per node (default from config: 20).
    #[arg(long)]
    pub walks_per_node: Option<usize>,

    /// Walk length (default from config: 10).
    #[arg(long)]
    pub walk_length: Option<usize>,

    /// Number of ANN trees (default from config: 10).
    #[arg(long)]
    pub num_trees: Option<usize>,

    /// Reciprocal weight applied to synthesized reverse edges (default 0.5).
    #[arg(long)]
    pub reciprocal_weight: Option<f64>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to a `cluster_global.ann` file. Defaults to `LYNCUP_ANN_DIR`'s
    /// layout.
    #[arg(long)]
    pub ann_path: Option<PathBuf>,

    /// If set, print this user's approximate top-k neighbours instead of
    /// just the index summary.
    #[arg(long)]
    pub user_id: Option<i64>,

    /// Neighbours to print when `--user-id` is set.
    #[arg(long, default_value = "10")]
    pub k: usize,
}
