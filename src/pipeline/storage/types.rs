use serde::{Deserialize, Serialize};

use super::StorageError;

/// A piece of a document's raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
}

/// Chunking strategy trait
pub trait Chunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk>;
}

/// Metadata attached to every chunk handed to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub chunk_id: String,
    pub timestamp: String,
}

/// Unit of retrieval-index ingestion: a text chunk or a field summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionChunk {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Destination for prepared chunks (vector store, file, queue).
pub trait IngestionSink {
    /// Store one document's chunks. Returns how many were accepted.
    fn ingest(&mut self, chunks: &[IngestionChunk]) -> Result<usize, StorageError>;
}
