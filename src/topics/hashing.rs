// Deterministic hash-based embeddings.
//
// Feature hashing over word tokens: each token adds a signed unit to one of
// `dim` buckets chosen by FNV-1a, and the result is L2-normalized. Texts that
// share words land near each other, which is all the clustering tests need.
// No model files, no randomness, identical output on every platform.

use anyhow::Result;

use super::traits::EmbeddingProvider;
use super::Embedding;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Default dimension for hashed embeddings.
pub const DEFAULT_HASH_DIM: usize = 64;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

impl HashEmbedder {
    /// A zero dimension is bumped to 1 so every vector is usable.
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Embed a single text.
    pub fn embed(&self, text: &str) -> Embedding {
        let mut v = vec![0.0; self.dim];
        for token in text.split_whitespace() {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn model_id(&self) -> &str {
        "fnv-hash"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_same_vector() {
        let e = HashEmbedder::default();
        assert_eq!(e.embed("robo celulares"), e.embed("robo celulares"));
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let e = HashEmbedder::new(16);
        let v = e.embed("incendio evacuacion bomberos");
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8);
        assert!(e.embed("").iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_encode_preserves_length_and_order() {
        let e = HashEmbedder::new(8);
        let texts = vec!["uno".to_string(), "".to_string(), "tres".to_string()];
        let out = e.encode(&texts).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], e.embed("uno"));
        assert_eq!(out[2], e.embed("tres"));
        assert_eq!(e.dimension(), 8);
    }
}
