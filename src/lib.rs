pub mod config;
pub mod pipeline;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::config::PipelineConfig;
use crate::pipeline::extraction::DocumentExtractor;
use crate::pipeline::processor::{write_records, BatchProcessor, ProcessingError};
use crate::pipeline::storage::{ingest_documents, JsonLinesSink, RecursiveChunker};

const USAGE: &str = "medscan <input_dir> [output.json] [chunks.jsonl]";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(io::stderr)
        .init();
}

/// Process a directory and write its records.
///
/// Records go to `output.json`, or stdout when omitted. With a third
/// argument, ingestion chunks are written there as JSON lines.
pub fn run<I: IntoIterator<Item = String>>(args: I) -> Result<(), ProcessingError> {
    let args: Vec<String> = args.into_iter().collect();
    let (input_dir, output, chunks_path) = match args.as_slice() {
        [input] => (input, None, None),
        [input, output] => (input, Some(output), None),
        [input, output, chunks] => (input, Some(output), Some(chunks)),
        _ => return Err(ProcessingError::Usage(USAGE.to_string())),
    };

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let processor = BatchProcessor::new(DocumentExtractor::with_defaults(PipelineConfig::from_env()));
    let documents = processor.process_directory(Path::new(input_dir))?;

    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_records(&documents, &mut writer)?;
            writer.flush()?;
            tracing::info!(path = %path, records = documents.len(), "Wrote records");
        }
        None => {
            let mut stdout = io::stdout().lock();
            write_records(&documents, &mut stdout)?;
            writeln!(stdout)?;
        }
    }

    if let Some(path) = chunks_path {
        let mut sink = JsonLinesSink::new(BufWriter::new(File::create(path)?));
        let total = ingest_documents(&documents, &RecursiveChunker::default(), &mut sink)?;
        tracing::info!(path = %path, chunks = total, "Wrote ingestion chunks");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_arity_is_usage_error() {
        assert!(matches!(run(Vec::<String>::new()), Err(ProcessingError::Usage(_))));
        let four = ["a", "b", "c", "d"].map(String::from);
        assert!(matches!(run(four), Err(ProcessingError::Usage(_))));
    }

    #[test]
    fn run_writes_empty_array_for_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), "nothing to see").unwrap();
        let out = dir.path().join("out.json");
        let chunks = dir.path().join("chunks.jsonl");

        run([
            dir.path().display().to_string(),
            out.display().to_string(),
            chunks.display().to_string(),
        ])
        .unwrap();

        let records: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert!(records.is_empty());
        assert_eq!(std::fs::read_to_string(&chunks).unwrap(), "");
    }

    #[test]
    fn missing_input_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run([dir.path().join("nope").display().to_string()]).unwrap_err();
        assert!(matches!(err, ProcessingError::ReadDir { .. }));
    }
}
