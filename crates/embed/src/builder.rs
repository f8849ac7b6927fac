use lyncup_core::config::EmbeddingConfig;
use lyncup_core::{Edge, Result};
use lyncup_ann::{AnnIndexArtifact, UserVector};

use crate::embedder::{EmbedParams, Embedder, Node2VecEmbedder};
use crate::graph::create_graph_from_likes;

/// Offline job assembling an [`AnnIndexArtifact`] from raw likes. Generic
/// over the embedding algorithm so tests can swap in a trivial `Embedder`
/// without running real walks/SGNS training.
pub struct EmbeddingBuilder<E: Embedder = Node2VecEmbedder> {
    embedder: E,
}

impl Default for EmbeddingBuilder<Node2VecEmbedder> {
    fn default() -> Self {
        Self {
            embedder: Node2VecEmbedder,
        }
    }
}

impl<E: Embedder> EmbeddingBuilder<E> {
    pub fn with_embedder(embedder: E) -> Self {
        Self { embedder }
    }

    /// Build an index from `likes`. Returns `Ok(None)` when `likes` is
    /// empty — callers log and skip, leaving any previous artifact in
    /// place.
    pub fn build(&self, likes: &[Edge], config: &EmbeddingConfig) -> Result<Option<AnnIndexArtifact>> {
        if likes.is_empty() {
            tracing::info!("no likes to embed, skipping build");
            return Ok(None);
        }

        let graph = create_graph_from_likes(likes, config.reciprocal_weight);
        tracing::info!(
            nodes = graph.node_count(),
            reciprocal_weight = config.reciprocal_weight,
            "graph constructed from likes"
        );

        let params = EmbedParams {
            dimensions: config.dimensions,
            walk_length: config.walk_length,
            walks_per_node: config.walks_per_node,
            return_param: config.return_param,
            in_out_param: config.in_out_param,
            window: config.window,
        };
        let vectors = self.embedder.train(&graph, &params);

        let mut users: Vec<UserVector> = graph
            .nodes()
            .iter()
            .filter_map(|&node| vectors.get(&node).map(|v| UserVector::new(node, v.clone())))
            .collect();
        users.sort_by_key(|u| u.user_id.0);

        let mut rng = rand::thread_rng();
        let artifact = AnnIndexArtifact::build(users, config.num_trees, &mut rng)?;
        tracing::info!(slots = artifact.len(), trees = artifact.num_trees(), "ann index built");

        Ok(Some(artifact))
    }
}
