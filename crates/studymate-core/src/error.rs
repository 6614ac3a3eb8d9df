use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid embedding input: {0}")]
    InvalidInput(String),

    #[error("Index is empty; add documents before searching")]
    IndexEmpty,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
