//! Offline embedding job: graph construction, biased random-walk + skip-gram
//! training, and ANN index assembly.

mod builder;
mod embedder;
mod graph;
mod walk;

pub use builder::EmbeddingBuilder;
pub use embedder::{EmbedParams, Embedder, Node2VecEmbedder};
pub use graph::{create_graph_from_likes, EmbeddingGraph};
