use std::collections::HashMap;

use lyncup_core::UserId;
use rand::Rng;

use crate::graph::EmbeddingGraph;
use crate::walk::generate_walks;

/// Number of full passes over the skip-gram pair corpus.
const SGNS_EPOCHS: usize = 5;
/// Negative samples drawn per positive pair.
const NEGATIVE_SAMPLES: usize = 5;
const LEARNING_RATE: f32 = 0.025;

/// Parameters for one embedding run, carried over verbatim from
/// `EmbeddingConfig`.
#[derive(Debug, Clone, Copy)]
pub struct EmbedParams {
    pub dimensions: usize,
    pub walk_length: usize,
    pub walks_per_node: usize,
    pub return_param: f64,
    pub in_out_param: f64,
    pub window: usize,
}

/// Trains a `D`-dimensional vector per graph node. Implemented as a trait
/// so the build orchestration (`EmbeddingBuilder`) stays decoupled from the
/// specific training algorithm, the way `LikesSource` decouples the builder
/// from its data origin.
pub trait Embedder {
    fn train(&self, graph: &EmbeddingGraph, params: &EmbedParams) -> HashMap<UserId, Vec<f32>>;
}

/// Biased second-order random walks (node2vec) feeding a skip-gram model
/// trained with negative sampling. Degenerates to weighted DeepWalk when
/// `p = q = 1`.
#[derive(Debug, Default)]
pub struct Node2VecEmbedder;

impl Embedder for Node2VecEmbedder {
    fn train(&self, graph: &EmbeddingGraph, params: &EmbedParams) -> HashMap<UserId, Vec<f32>> {
        let walks = generate_walks(
            graph,
            params.walks_per_node,
            params.walk_length,
            params.return_param,
            params.in_out_param,
        );

        let pairs = skip_gram_pairs(&walks, params.window);
        train_sgns(graph.nodes(), &pairs, params.dimensions)
    }
}

/// Extract `(center, context)` pairs from every walk using a sliding window
/// of `window` positions on either side — the standard skip-gram corpus
/// construction.
fn skip_gram_pairs(walks: &[Vec<UserId>], window: usize) -> Vec<(UserId, UserId)> {
    let mut pairs = Vec::new();
    for walk in walks {
        for (i, &center) in walk.iter().enumerate() {
            let lo = i.saturating_sub(window);
            let hi = (i + window + 1).min(walk.len());
            for &context in &walk[lo..hi] {
                if context != center {
                    pairs.push((center, context));
                }
            }
        }
    }
    pairs
}

/// Single-threaded skip-gram-with-negative-sampling training (SGNS) over
/// `pairs`, producing one output-side embedding vector per node. Training
/// runs on one thread because the dense weight update per pair is cheap
/// and the walk corpus (the part worth parallelizing) was already built by
/// `generate_walks`.
fn train_sgns(
    nodes: &[UserId],
    pairs: &[(UserId, UserId)],
    dimensions: usize,
) -> HashMap<UserId, Vec<f32>> {
    let mut rng = rand::thread_rng();
    let scale = 0.5 / dimensions as f32;

    let mut in_vectors: HashMap<UserId, Vec<f32>> = nodes
        .iter()
        .map(|&n| (n, random_vector(dimensions, scale, &mut rng)))
        .collect();
    let mut out_vectors: HashMap<UserId, Vec<f32>> = nodes
        .iter()
        .map(|&n| (n, random_vector(dimensions, scale, &mut rng)))
        .collect();

    if pairs.is_empty() || nodes.len() < 2 {
        return in_vectors;
    }

    for _ in 0..SGNS_EPOCHS {
        for &(center, context) in pairs {
            sgns_step(&mut in_vectors, &mut out_vectors, nodes, center, context, &mut rng);
        }
    }

    in_vectors
}

fn sgns_step(
    in_vectors: &mut HashMap<UserId, Vec<f32>>,
    out_vectors: &mut HashMap<UserId, Vec<f32>>,
    nodes: &[UserId],
    center: UserId,
    context: UserId,
    rng: &mut impl Rng,
) {
    // Positive update: push `in[center]` and `out[context]` together.
    update_pair(in_vectors, out_vectors, center, context, 1.0);

    // Negative updates: push `in[center]` away from a handful of random nodes.
    for _ in 0..NEGATIVE_SAMPLES {
        let negative = nodes[rng.gen_range(0..nodes.len())];
        if negative == context {
            continue;
        }
        update_pair(in_vectors, out_vectors, center, negative, 0.0);
    }
}

fn update_pair(
    in_vectors: &mut HashMap<UserId, Vec<f32>>,
    out_vectors: &mut HashMap<UserId, Vec<f32>>,
    center: UserId,
    other: UserId,
    label: f32,
) {
    let dot: f32 = {
        let c = &in_vectors[&center];
        let o = &out_vectors[&other];
        c.iter().zip(o.iter()).map(|(a, b)| a * b).sum()
    };
    let prediction = sigmoid(dot);
    let gradient = LEARNING_RATE * (label - prediction);

    let out_snapshot = out_vectors[&other].clone();
    {
        let c = in_vectors.get_mut(&center).unwrap();
        for (ci, oi) in c.iter_mut().zip(out_snapshot.iter()) {
            *ci += gradient * oi;
        }
    }
    let in_snapshot = in_vectors[&center].clone();
    {
        let o = out_vectors.get_mut(&other).unwrap();
        for (oi, ci) in o.iter_mut().zip(in_snapshot.iter()) {
            *oi += gradient * ci;
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn random_vector(dimensions: usize, scale: f32, rng: &mut impl Rng) -> Vec<f32> {
    (0..dimensions)
        .map(|_| (rng.gen::<f32>() - 0.5) * 2.0 * scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::create_graph_from_likes;
    use lyncup_core::Edge;

    #[test]
    fn skip_gram_pairs_excludes_self_pairs() {
        let walk = vec![UserId(1), UserId(2), UserId(3)];
        let pairs = skip_gram_pairs(&[walk], 1);
        assert!(pairs.iter().all(|(a, b)| a != b));
    }

    #[test]
    fn train_produces_one_vector_per_node_with_requested_dimensions() {
        let likes = vec![
            Edge::new(UserId(1), UserId(2), 1.0),
            Edge::new(UserId(2), UserId(3), 1.0),
            Edge::new(UserId(3), UserId(1), 1.0),
        ];
        let graph = create_graph_from_likes(&likes, 0.5);
        let params = EmbedParams {
            dimensions: 8,
            walk_length: 5,
            walks_per_node: 3,
            return_param: 1.0,
            in_out_param: 1.0,
            window: 2,
        };
        let embedder = Node2VecEmbedder;
        let vectors = embedder.train(&graph, &params);
        assert_eq!(vectors.len(), graph.node_count());
        for v in vectors.values() {
            assert_eq!(v.len(), 8);
        }
    }
}
