// Topic analysis: embeddings, clustering and keyword frequency rankings.

pub mod frequency;
pub mod hashing;
pub mod kmeans;
pub mod traits;

#[cfg(feature = "onnx")]
pub mod embeddings;

/// Dense vector produced by an embedding provider.
pub type Embedding = Vec<f64>;
