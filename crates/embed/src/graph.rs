use std::collections::BTreeMap;

use lyncup_core::{Edge, UserId};

/// Directed weighted adjacency structure built from raw likes, reduced to
/// what the embedder actually needs: per-node out-edges plus a stable node
/// ordering.
#[derive(Debug, Default)]
pub struct EmbeddingGraph {
    /// Ascending node ids — the slot assignment order embedding vectors
    /// are later read back in.
    nodes: Vec<UserId>,
    outgoing: BTreeMap<UserId, Vec<(UserId, f64)>>,
}

impl EmbeddingGraph {
    pub fn nodes(&self) -> &[UserId] {
        &self.nodes
    }

    pub fn neighbors(&self, node: UserId) -> &[(UserId, f64)] {
        self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Build the directed weighted graph from raw likes, synthesizing reverse
/// edges at `reciprocal_weight × original weight` wherever no reverse edge
/// was present in the input.
pub fn create_graph_from_likes(likes: &[Edge], reciprocal_weight: f64) -> EmbeddingGraph {
    let mut forward: BTreeMap<(UserId, UserId), f64> = BTreeMap::new();
    for edge in likes {
        *forward.entry((edge.from, edge.to)).or_insert(0.0) += edge.weight;
    }

    let mut combined = forward.clone();
    for (&(u, v), &w) in &forward {
        if !forward.contains_key(&(v, u)) {
            *combined.entry((v, u)).or_insert(0.0) += w * reciprocal_weight;
        }
    }

    let mut outgoing: BTreeMap<UserId, Vec<(UserId, f64)>> = BTreeMap::new();
    let mut node_set: std::collections::BTreeSet<UserId> = std::collections::BTreeSet::new();
    for (&(u, v), &w) in &combined {
        node_set.insert(u);
        node_set.insert(v);
        outgoing.entry(u).or_default().push((v, w));
    }

    EmbeddingGraph {
        nodes: node_set.into_iter().collect(),
        outgoing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_edge_is_synthesized_when_absent() {
        let likes = vec![Edge::new(UserId(1), UserId(2), 4.0)];
        let graph = create_graph_from_likes(&likes, 0.5);
        let reverse = graph.neighbors(UserId(2));
        assert_eq!(reverse, &[(UserId(1), 2.0)]);
    }

    #[test]
    fn existing_reverse_edge_is_not_overwritten() {
        let likes = vec![
            Edge::new(UserId(1), UserId(2), 4.0),
            Edge::new(UserId(2), UserId(1), 1.0),
        ];
        let graph = create_graph_from_likes(&likes, 0.5);
        assert_eq!(graph.neighbors(UserId(2)), &[(UserId(1), 1.0)]);
    }

    #[test]
    fn duplicate_edges_sum_weights() {
        let likes = vec![
            Edge::new(UserId(1), UserId(2), 1.0),
            Edge::new(UserId(1), UserId(2), 3.0),
        ];
        let graph = create_graph_from_likes(&likes, 0.5);
        assert_eq!(graph.neighbors(UserId(1)), &[(UserId(2), 4.0)]);
    }

    #[test]
    fn node_set_is_union_of_endpoints_sorted_ascending() {
        let likes = vec![Edge::new(UserId(5), UserId(1), 1.0)];
        let graph = create_graph_from_likes(&likes, 0.5);
        assert_eq!(graph.nodes(), &[UserId(1), UserId(5)]);
    }
}
