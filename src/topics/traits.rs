// Embedding provider trait, the abstraction over the sentence model.
//
// The clustering stage only needs "texts in, vectors out". The default
// implementation runs a multilingual sentence-transformer locally via ONNX;
// tests and offline runs use the deterministic HashEmbedder instead.

use anyhow::Result;

use super::Embedding;

/// Maps texts to fixed-dimensional dense vectors.
///
/// `encode` is synchronous and blocking: it returns once every vector is
/// ready, one per input text and in input order. Batching and hardware
/// acceleration are the provider's business.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the underlying model.
    fn model_id(&self) -> &str;

    /// Length of every vector this provider produces.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts.
    fn encode(&self, texts: &[String]) -> Result<Vec<Embedding>>;
}
