use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected at construction time; never raised while serving a request.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Document '{doc_id}' is missing required tag '{key}'")]
    MissingMetadata { doc_id: String, key: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transcoding failed: {0}")]
    Transcoding(String),

    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode failed: {0}")]
    Decode(String),
}

impl Error {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem { path: path.into(), source }
    }

    pub fn missing_metadata(doc_id: &str, key: &str) -> Self {
        Self::MissingMetadata { doc_id: doc_id.to_string(), key: key.to_string() }
    }

    /// Whether the error only affects the document being processed.
    pub fn is_per_document(&self) -> bool {
        !matches!(self, Self::InvalidConfiguration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
