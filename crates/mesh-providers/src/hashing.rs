//! Deterministic local embedder based on token hashing.

use async_trait::async_trait;
use mesh_core::{EmbeddingProvider, MeshError, MeshResult};
use sha2::{Digest, Sha256};

/// Feature-hashing embedder for local development and tests.
///
/// Each lowercase alphanumeric token is hashed with SHA-256 into one signed
/// bucket; the result is L2-normalised. Identical text always yields the
/// identical vector, and texts sharing vocabulary have positive similarity.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    /// Create an embedder producing `dimension`-length vectors
    ///
    /// # Errors
    /// Returns a configuration error for a zero dimension
    pub fn new(dimension: usize) -> MeshResult<Self> {
        if dimension == 0 {
            return Err(MeshError::configuration(
                "hashing embedder dimension must be greater than zero",
            ));
        }
        Ok(Self { dimension })
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let lower = text.to_lowercase();
        let mut tokens = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .peekable();

        if tokens.peek().is_none() {
            // Text with no tokens still gets a stable, non-zero vector.
            let (index, sign) = self.bucket(&lower);
            vector[index] = sign;
            return vector;
        }

        for token in tokens {
            let (index, sign) = self.bucket(token);
            vector[index] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        } else {
            // Opposite-signed collisions cancelled out entirely.
            let (index, sign) = self.bucket(&lower);
            vector[index] = sign;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> MeshResult<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
