pub mod types;
pub mod chunker;
pub mod ingest;

pub use types::*;
pub use chunker::*;
pub use ingest::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
