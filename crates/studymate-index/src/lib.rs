//! In-memory semantic index over embedded text chunks.
//!
//! Records are append-only and kept in insertion order. `add` embeds a whole
//! batch before taking the write lock and appends it in one step, so a
//! concurrent `search` sees either all of a batch or none of it. Queries are
//! answered by an exhaustive cosine scan (see [`search::rank`]).

pub mod search;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use studymate_core::error::{Error, Result};
use studymate_core::traits::{Embedder, Retriever};
use studymate_core::types::{Chunk, ChunkRecord, SearchHit};

pub use search::{cosine_similarity, rank};

pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    dim: usize,
    records: RwLock<Vec<ChunkRecord>>,
}

impl SemanticIndex {
    /// Create an empty index whose dimension is fixed by `embedder`.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dim = embedder.dim();
        Self { embedder, dim, records: RwLock::new(Vec::new()) }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn embedder_id(&self) -> &str { self.embedder.id() }

    /// Number of stored records. Batches are appended whole, so the count
    /// stays accurate even after a writer panicked.
    pub fn len(&self) -> usize {
        let records = self.records.read().unwrap_or_else(|poisoned| {
            warn!("index lock poisoned; reporting stored records");
            PoisonError::into_inner(poisoned)
        });
        records.len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// True once at least one chunk has been indexed.
    pub fn is_ready(&self) -> bool { !self.is_empty() }

    /// Embed and append `chunks` in order. Either every chunk is stored or,
    /// on any error, none is. Returns the number of records added.
    pub fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        if let Some(pos) = chunks.iter().position(|c| c.text.trim().is_empty()) {
            return Err(Error::InvalidArgument(format!(
                "chunk {pos} from '{}' has empty text",
                chunks[pos].source
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        if embeddings.len() != chunks.len() {
            return Err(Error::ProviderUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        for e in &embeddings {
            self.check_vector(e)?;
        }

        let batch: Vec<ChunkRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(c, embedding)| ChunkRecord { text: c.text.clone(), source: c.source.clone(), embedding })
            .collect();
        let added = batch.len();
        let total = {
            let mut records = self.write()?;
            records.extend(batch);
            records.len()
        };
        info!(added, total, embedder = self.embedder.id(), "indexed chunks");
        Ok(added)
    }

    /// Return up to `k` records most similar to `query`, best first.
    ///
    /// Fails with `InvalidArgument` when `k == 0` and with `IndexEmpty` when
    /// nothing has been indexed. A `k` larger than the index returns every
    /// record.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        if self.read()?.is_empty() {
            return Err(Error::IndexEmpty);
        }
        let query_vec = self.embedder.embed_text(query)?;
        self.check_vector(&query_vec)?;

        let records = self.read()?;
        let hits = rank(&query_vec, &records, k);
        debug!(k, scanned = records.len(), returned = hits.len(), "search");
        Ok(hits)
    }

    fn check_vector(&self, v: &[f32]) -> Result<()> {
        if v.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, got: v.len() });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(Error::ProviderUnavailable("embedder returned non-finite values".into()));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<ChunkRecord>>> {
        self.records.read().map_err(|e| Error::Operation(format!("index lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<ChunkRecord>>> {
        self.records.write().map_err(|e| Error::Operation(format!("index lock poisoned: {e}")))
    }
}

impl Retriever for SemanticIndex {
    fn add(&self, chunks: &[Chunk]) -> Result<usize> { Self::add(self, chunks) }
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> { Self::search(self, query, k) }
    fn len(&self) -> usize { Self::len(self) }
}
