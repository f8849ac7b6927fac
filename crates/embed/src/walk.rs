use lyncup_core::UserId;
use rand::Rng;
use rayon::prelude::*;

use crate::graph::EmbeddingGraph;

/// Generate `walks_per_node` biased second-order random walks of length
/// `walk_length` starting from every node in `graph`.
///
/// Walk generation is parallelized per starting node with `rayon`: each
/// node's walks are independent, so the split is embarrassingly parallel.
pub fn generate_walks(
    graph: &EmbeddingGraph,
    walks_per_node: usize,
    walk_length: usize,
    p: f64,
    q: f64,
) -> Vec<Vec<UserId>> {
    graph
        .nodes()
        .par_iter()
        .flat_map(|&start| {
            let mut rng = rand::thread_rng();
            (0..walks_per_node)
                .map(|_| walk_from(graph, start, walk_length, p, q, &mut rng))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn walk_from(
    graph: &EmbeddingGraph,
    start: UserId,
    walk_length: usize,
    p: f64,
    q: f64,
    rng: &mut impl Rng,
) -> Vec<UserId> {
    let mut walk = Vec::with_capacity(walk_length);
    walk.push(start);

    let mut prev: Option<UserId> = None;
    let mut cur = start;

    for _ in 1..walk_length {
        let neighbors = graph.neighbors(cur);
        if neighbors.is_empty() {
            break;
        }

        let next = match prev {
            None => weighted_choice(neighbors, rng),
            Some(prev_node) => {
                let prev_neighbors = graph.neighbors(prev_node);
                let biased: Vec<(UserId, f64)> = neighbors
                    .iter()
                    .map(|&(candidate, weight)| {
                        let factor = if candidate == prev_node {
                            1.0 / p
                        } else if prev_neighbors.iter().any(|&(n, _)| n == candidate) {
                            1.0
                        } else {
                            1.0 / q
                        };
                        (candidate, weight * factor)
                    })
                    .collect();
                weighted_choice(&biased, rng)
            }
        };

        prev = Some(cur);
        cur = next;
        walk.push(cur);
    }

    walk
}

fn weighted_choice(candidates: &[(UserId, f64)], rng: &mut impl Rng) -> UserId {
    let total: f64 = candidates.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return candidates[rng.gen_range(0..candidates.len())].0;
    }
    let mut threshold = rng.gen_range(0.0..total);
    for &(node, weight) in candidates {
        threshold -= weight.max(0.0);
        if threshold <= 0.0 {
            return node;
        }
    }
    candidates[candidates.len() - 1].0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::create_graph_from_likes;
    use lyncup_core::Edge;

    #[test]
    fn every_walk_starts_at_its_own_node_and_respects_length() {
        let likes = vec![
            Edge::new(UserId(1), UserId(2), 1.0),
            Edge::new(UserId(2), UserId(3), 1.0),
            Edge::new(UserId(3), UserId(1), 1.0),
        ];
        let graph = create_graph_from_likes(&likes, 0.5);
        let walks = generate_walks(&graph, 4, 6, 1.0, 1.0);
        assert_eq!(walks.len(), graph.node_count() * 4);
        for walk in &walks {
            assert!(walk.len() <= 6);
            assert!(!walk.is_empty());
        }
    }

    #[test]
    fn dead_end_node_produces_a_short_walk_instead_of_panicking() {
        let likes = vec![Edge::new(UserId(1), UserId(2), 1.0)];
        let graph = create_graph_from_likes(&likes, 0.0);
        let walks = generate_walks(&graph, 1, 10, 1.0, 1.0);
        assert!(walks.iter().any(|w| w.len() < 10));
    }
}
