//! Turns PDF and plain-text files into `(text, source)` chunks.
//!
//! Text is cut into fixed-size character windows that overlap by a fixed
//! number of characters. Windows containing only whitespace are dropped.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::Chunk;

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// Split `text` into windows of `chunk_size` characters, each starting
/// `chunk_size - overlap` characters after the previous one.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(Error::InvalidArgument("chunk_size must be at least 1".into()));
    }
    if overlap >= chunk_size {
        return Err(Error::InvalidArgument(format!(
            "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            chunks.push(window);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    Ok(chunks)
}

/// Extract the text layer of a PDF file.
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|e| Error::Extraction(format!("{}: {}", path.display(), e)))
}

fn read_text_file(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
}

/// True for the file types `DocumentLoader` can read.
pub fn is_supported(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    chunking: ChunkingSettings,
}

impl DocumentLoader {
    pub fn new(chunking: ChunkingSettings) -> Self {
        Self { chunking }
    }

    /// Extract and chunk one file. The source label is the file name.
    pub fn load_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let text = match extension_of(path).as_deref() {
            Some("pdf") => extract_pdf_text(path)?,
            Some("txt") => read_text_file(path)?,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unsupported file type: {}",
                    path.display()
                )))
            }
        };
        let source = source_label(path);
        let chunks: Vec<Chunk> = chunk_text(&text, self.chunking.chunk_size, self.chunking.overlap)?
            .into_iter()
            .map(|t| Chunk::new(t, source.clone()))
            .collect();
        debug!(source = %source, chars = text.chars().count(), chunks = chunks.len(), "chunked document");
        Ok(chunks)
    }
}

/// Expand directories into their supported files, sorted; plain file paths
/// are kept in the order given.
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_supported(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file or directory: {}", path.display()),
            )));
        }
    }
    info!(files = files.len(), "collected documents");
    Ok(files)
}

fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
