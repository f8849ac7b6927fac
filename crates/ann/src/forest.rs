//! A forest of random hyperplane-projection trees over the angular metric,
//! in the Annoy family of techniques, implemented directly rather than
//! bound through FFI.
//!
//! Each tree recursively splits its point set at a hyperplane through two
//! sampled points; `query` walks every tree from the root, collects
//! candidate slots from the visited leaves, then exact-reranks by true
//! cosine distance — the usual two-stage approximate/exact design.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Points per leaf before a tree stops splitting.
const LEAF_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Inner {
        /// Hyperplane normal (difference of the two pivot vectors).
        normal: Vec<f32>,
        /// Split threshold: points with `dot(normal, v) <= offset` go left.
        offset: f32,
        left: u32,
        right: u32,
    },
    Leaf {
        slots: Vec<u32>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    root: u32,
}

impl Tree {
    fn build(slots: Vec<u32>, vectors: &[Vec<f32>], rng: &mut impl Rng) -> Self {
        let mut nodes = Vec::new();
        let root = Self::build_node(slots, vectors, rng, &mut nodes);
        Self { nodes, root }
    }

    fn build_node(
        slots: Vec<u32>,
        vectors: &[Vec<f32>],
        rng: &mut impl Rng,
        nodes: &mut Vec<TreeNode>,
    ) -> u32 {
        if slots.len() <= LEAF_SIZE {
            nodes.push(TreeNode::Leaf { slots });
            return (nodes.len() - 1) as u32;
        }

        // Pick two distinct random pivots to define the splitting hyperplane.
        let mut candidates = slots.clone();
        candidates.shuffle(rng);
        let a = &vectors[candidates[0] as usize];
        let b_idx = candidates
            .iter()
            .skip(1)
            .find(|&&s| vectors[s as usize] != *a)
            .copied()
            .unwrap_or(candidates[0]);
        let b = &vectors[b_idx as usize];

        let normal: Vec<f32> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
        let midpoint: Vec<f32> = a.iter().zip(b.iter()).map(|(x, y)| (x + y) / 2.0).collect();
        let offset = dot(&normal, &midpoint);

        let mut left_slots = Vec::new();
        let mut right_slots = Vec::new();
        for &slot in &slots {
            if dot(&normal, &vectors[slot as usize]) <= offset {
                left_slots.push(slot);
            } else {
                right_slots.push(slot);
            }
        }

        // Degenerate split (all points on one side, e.g. duplicate vectors)
        // — fall back to a leaf rather than recursing forever.
        if left_slots.is_empty() || right_slots.is_empty() {
            nodes.push(TreeNode::Leaf { slots });
            return (nodes.len() - 1) as u32;
        }

        let left = Self::build_node(left_slots, vectors, rng, nodes);
        let right = Self::build_node(right_slots, vectors, rng, nodes);

        nodes.push(TreeNode::Inner {
            normal,
            offset,
            left,
            right,
        });
        (nodes.len() - 1) as u32
    }

    /// Collect candidate slots from the leaf(s) a query vector routes to.
    fn collect(&self, query: &[f32], out: &mut Vec<u32>) {
        let mut cursor = self.root;
        loop {
            match &self.nodes[cursor as usize] {
                TreeNode::Leaf { slots } => {
                    out.extend_from_slice(slots);
                    return;
                }
                TreeNode::Inner {
                    normal,
                    offset,
                    left,
                    right,
                } => {
                    cursor = if dot(normal, query) <= *offset { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    /// Build `num_trees` trees over `vectors` (indexed by dense slot).
    pub fn build(vectors: &[Vec<f32>], num_trees: usize, rng: &mut impl Rng) -> Self {
        let all_slots: Vec<u32> = (0..vectors.len() as u32).collect();
        let trees = (0..num_trees.max(1))
            .map(|_| Tree::build(all_slots.clone(), vectors, rng))
            .collect();
        Self { trees }
    }

    /// Return candidate slots gathered from every tree (deduplicated), not
    /// yet reranked — the caller does the exact distance pass.
    pub fn candidates(&self, query: &[f32]) -> Vec<u32> {
        let mut out = Vec::new();
        for tree in &self.trees {
            tree.collect(query, &mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn norm(a: &[f32]) -> f32 {
    dot(a, a).sqrt()
}

/// Cosine (angular) distance: `1 - cos_similarity`, in `[0, 2]`. Lower is
/// closer. Monotonic with true angular distance, which is all `topK`'s
/// ordering guarantee requires.
pub fn angular_distance(a: &[f32], b: &[f32]) -> f32 {
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 2.0;
    }
    1.0 - (dot(a, b) / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn candidates_include_nearby_points() {
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![-1.0, 0.0],
            vec![-0.9, -0.1],
        ];
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let forest = Forest::build(&vectors, 8, &mut rng);
        let candidates = forest.candidates(&vectors[0]);
        assert!(candidates.contains(&0));
    }

    #[test]
    fn angular_distance_is_zero_for_identical_vectors() {
        let v = vec![0.3, 0.4, 0.5];
        assert!(angular_distance(&v, &v) < 1e-6);
    }

    #[test]
    fn angular_distance_is_large_for_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((angular_distance(&a, &b) - 2.0).abs() < 1e-6);
    }
}
