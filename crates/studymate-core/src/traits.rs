use crate::error::Result;
use crate::types::{Chunk, SearchHit};

/// Maps text to a dense vector of fixed dimension.
///
/// Implementations must be deterministic, must reject empty input with
/// `Error::InvalidInput`, and must report model failures as
/// `Error::ProviderUnavailable` instead of returning zeros.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d1024`).
    fn id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Stores chunks and answers top-k similarity queries.
pub trait Retriever: Send + Sync {
    fn add(&self, chunks: &[Chunk]) -> Result<usize>;
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
    fn len(&self) -> usize;

    fn is_ready(&self) -> bool {
        self.len() > 0
    }
}

/// Produces a completion for a fully assembled prompt.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}
