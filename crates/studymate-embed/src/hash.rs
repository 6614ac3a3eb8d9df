use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use studymate_core::error::{Error, Result};
use studymate_core::traits::Embedder;

/// Deterministic bag-of-words embedder based on feature hashing.
///
/// Each lower-cased alphanumeric token is hashed with xxHash64 (seed 0) into
/// one of `dim` buckets with a weight in `[0, 1]`; the vector is then
/// L2-normalized. Texts sharing vocabulary get similar vectors, which is
/// enough for offline use and tests. A text without any token maps to the
/// zero vector.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidArgument("hash embedder dimension must be at least 1".into()));
        }
        Ok(Self { dim, id: format!("hash:d{dim}") })
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { self.dim }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("cannot embed empty text".into()));
        }
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let weight = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 0.5 + 0.5 * weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        Ok(v)
    }
}
