//! Domain types shared by ingestion, the semantic index and the answer layer.

use serde::{Deserialize, Serialize};

/// A `(text, source)` pair produced by ingestion and accepted by `add`.
///
/// - `text`: raw chunk content, must not be empty
/// - `source`: label of the originating document (usually the file name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self { text: text.into(), source: source.into() }
    }
}

/// A chunk as stored by the index, together with its embedding.
///
/// Records are never mutated after insertion. `embedding.len()` equals the
/// dimension of the provider that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub source: String,
    pub embedding: Vec<f32>,
}

/// One ranked result of a similarity search.
///
/// `score` is the cosine similarity between the query and the chunk, in
/// `[-1.0, 1.0]`; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub score: f32,
}
