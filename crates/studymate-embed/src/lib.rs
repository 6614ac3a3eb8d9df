//! Embedding providers for the semantic index.
//!
//! `HashEmbedder` needs no model files and is used offline and in tests;
//! `BgeM3Embedder` runs BGE-M3 locally through candle.

mod device;
mod hash;
mod model;
mod pool;
mod tokenize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use studymate_core::config::{expand_path, EmbeddingProvider, EmbeddingSettings};
use studymate_core::error::{Error, Result};
use studymate_core::traits::Embedder;

pub use hash::HashEmbedder;
pub use model::{BgeM3Embedder, BGE_M3_DIM};
pub use pool::masked_mean_l2;

/// Build the provider selected by `settings.provider`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider {
        EmbeddingProvider::Hash => {
            info!(dim = settings.dim, "using hashing embedder");
            Ok(Arc::new(HashEmbedder::new(settings.dim)?))
        }
        EmbeddingProvider::BgeM3 => {
            let dir = resolve_model_dir(settings.model_dir.as_deref())?;
            Ok(Arc::new(BgeM3Embedder::load(&dir)?))
        }
    }
}

/// Locate the BGE-M3 model directory: the configured path first, then
/// `APP_MODEL_DIR`, `MODEL_DIR`, `models/bge-m3` and `../models/bge-m3`.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = configured {
        candidates.push(expand_path(dir));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            candidates.push(expand_path(dir));
        }
    }
    candidates.push(Path::new("models/bge-m3").to_path_buf());
    candidates.push(Path::new("../models/bge-m3").to_path_buf());

    for p in &candidates {
        if p.is_dir() {
            debug!(model_dir = %p.display(), "resolved model directory");
            return Ok(p.clone());
        }
    }
    Err(Error::ProviderUnavailable(format!(
        "could not locate BGE-M3 model directory (tried {})",
        candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    )))
}
