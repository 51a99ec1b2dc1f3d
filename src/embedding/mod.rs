pub mod http;

use crate::error::Result;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly `dimensions()` length. The
/// engine owns one boxed implementation per process; tests substitute a
/// deterministic one.
pub trait Embedder: Send + Sync {
    /// Embed a batch of text strings, one vector per input, same order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text string into a vector.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text])?;
        Ok(batch.remove(0))
    }

    /// Return the number of dimensions this embedder produces.
    fn dimensions(&self) -> usize;

    /// Bounded health probe. Returns false on any failure without raising.
    fn is_available(&self) -> bool;
}

/// Serialize an f32 vector to little-endian bytes for the vec0 table.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(embedding.len() * 4);
    for &f in embedding {
        buf.extend_from_slice(&f.to_le_bytes());
    }
    buf
}

/// Deserialize little-endian bytes back to an f32 vector.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("4 bytes")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        let v = vec![0.0f32, 1.5, -2.25, 1e-6];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)), v);
    }
}
