//! Approximate nearest-neighbour index over user embedding vectors: a
//! hand-rolled random-hyperplane-projection forest under the angular
//! metric, built offline and served read-only at match time.

mod artifact;
mod forest;
mod index;

pub use artifact::{AnnIndexArtifact, Metric, UserVector};
pub use index::AnnIndex;
