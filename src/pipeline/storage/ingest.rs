use std::io::Write;

use super::types::{ChunkMetadata, Chunker, IngestionChunk, IngestionSink};
use super::StorageError;
use crate::pipeline::processor::ProcessedDocument;

/// Turn a processed document into index-ready chunks.
///
/// When fields were parsed, a `{filename}_summary` chunk listing them comes
/// first; text chunks follow as `{filename}_{i}`.
pub fn prepare_chunks(doc: &ProcessedDocument, chunker: &dyn Chunker) -> Vec<IngestionChunk> {
    let timestamp = doc.timestamp_iso();
    let make = |chunk_id: String, text: String| IngestionChunk {
        metadata: ChunkMetadata {
            filename: doc.filename.clone(),
            chunk_id: chunk_id.clone(),
            timestamp: timestamp.clone(),
        },
        chunk_id,
        text,
    };

    let mut chunks = Vec::new();
    if !doc.parsed_fields.is_empty() {
        chunks.push(make(
            format!("{}_summary", doc.filename),
            doc.parsed_fields.summary_text(),
        ));
    }

    chunks.extend(
        chunker
            .chunk(&doc.raw_text.text)
            .into_iter()
            .map(|c| make(format!("{}_{}", doc.filename, c.chunk_index), c.content)),
    );

    chunks
}

/// Chunk every document and hand each document's chunks to the sink.
/// Returns the total number of chunks accepted.
pub fn ingest_documents(
    documents: &[ProcessedDocument],
    chunker: &dyn Chunker,
    sink: &mut dyn IngestionSink,
) -> Result<usize, StorageError> {
    let mut total = 0;
    for doc in documents {
        let chunks = prepare_chunks(doc, chunker);
        let accepted = sink.ingest(&chunks)?;
        tracing::info!(file = %doc.filename, chunks = accepted, "Ingested document chunks");
        total += accepted;
    }
    Ok(total)
}

/// Writes chunks as newline-delimited JSON.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> IngestionSink for JsonLinesSink<W> {
    fn ingest(&mut self, chunks: &[IngestionChunk]) -> Result<usize, StorageError> {
        for chunk in chunks {
            serde_json::to_writer(&mut self.writer, chunk)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(chunks.len())
    }
}
