//! Errors during import

use std::fmt;

use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Errors raised while driving an import session.
///
/// The whole enum is `Clone + PartialEq` because the session keeps the
/// errors it has seen and deduplicates them by equality.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Cannot determine the file type")]
    UnknownFileType,

    #[error("No import file selected")]
    NoFileSelected,

    #[error("No target collection selected")]
    NoNamespace,

    #[error("An import is already in progress")]
    ImportInProgress,

    #[error("Failed to analyze fields: {0}")]
    Analysis(String),

    #[error("{0}")]
    Document(DocumentError),

    #[error("Import failed: {0}")]
    Pipeline(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> Self {
        ImportError::Io(e.to_string())
    }
}

/// A single failed document write, as reported by the write executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentError {
    /// Zero-based position of the document in the source file, when known.
    pub index: Option<u64>,
    pub message: String,
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "Write failed for document {}: {}", index, self.message),
            None => write!(f, "Write failed: {}", self.message),
        }
    }
}
