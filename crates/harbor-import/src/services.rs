//! External collaborator interfaces for the import pipeline
//!
//! The byte-level CSV/JSON readers, the document-store write path, and the
//! host filesystem are black boxes behind these traits; the orchestrator
//! only relies on the contracts documented here.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use harbor_core::{AppEventSink, Namespace};

use crate::cancel::CancelToken;
use crate::error::{DocumentError, ImportError, Result};
use crate::session::{Delimiter, TabularType};

/// Basic metadata for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub size: u64,
}

/// Filesystem metadata access.
#[async_trait]
pub trait FileMetadata: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn stat(&self, path: &Path) -> Result<FileStats>;
}

/// `FileMetadata` backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileMetadata;

#[async_trait]
impl FileMetadata for LocalFileMetadata {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn stat(&self, path: &Path) -> Result<FileStats> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileStats { size: meta.len() })
    }
}

/// Outcome of sniffing the first bytes of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTypeDetection {
    Csv { delimiter: Delimiter },
    Json,
    /// Newline-delimited JSON; becomes `FileType::Json` with the multiline
    /// flag set on the session.
    Jsonl,
    Unknown,
}

/// Sniffs the file format (and delimiter, for tabular input).
#[async_trait]
pub trait FileTypeDetector: Send + Sync {
    async fn detect(&self, path: &Path) -> Result<FileTypeDetection>;
}

/// Ordered raw header names plus a bounded set of preview rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    pub header_fields: Vec<String>,
    pub preview_rows: Vec<Vec<String>>,
}

/// Reads the header row and a handful of preview rows from a tabular file.
#[async_trait]
pub trait HeaderLister: Send + Sync {
    async fn list_fields(&self, path: &Path, delimiter: Delimiter) -> Result<HeaderList>;
}

/// Per-path outcome of the type analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAnalysis {
    /// The narrowest type every sampled value coerces to.
    pub detected: TabularType,
    /// Rows sampled for this path.
    pub rows: u64,
    /// Rows whose value was blank.
    pub blanks: u64,
}

/// Result of analyzing every column of a tabular file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub fields: HashMap<String, FieldAnalysis>,
}

/// Detects column types by scanning the file.
#[async_trait]
pub trait FieldAnalyzer: Send + Sync {
    /// Analyze column types.
    ///
    /// Must observe `token` and return promptly after cancellation, with no
    /// side effects beyond what was already flushed.
    async fn analyze(
        &self,
        path: &Path,
        delimiter: Delimiter,
        ignore_empty_strings: bool,
        token: CancelToken,
    ) -> Result<AnalysisReport>;
}

/// Periodic sample reported by the write executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub docs_processed: u64,
    pub docs_written: u64,
    pub bytes_processed: u64,
}

/// Progress callback invoked by the write executor.
pub type ProgressCallback = Box<dyn Fn(ProgressSample) + Send + Sync>;

/// Per-document failure callback invoked by the write executor.
pub type DocumentErrorCallback = Box<dyn Fn(DocumentError) + Send + Sync>;

/// Format-specific parameters of one write run.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteFormat {
    Csv {
        delimiter: Delimiter,
        /// Effective `(path, type)` coercion map: the checked fields minus
        /// exclusions, in field order.
        fields: Vec<(String, TabularType)>,
        ignore_empty_strings: bool,
    },
    Json {
        multiline: bool,
    },
}

/// Everything the write executor needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteJob {
    pub namespace: Namespace,
    pub file_name: String,
    pub file_size: u64,
    pub format: WriteFormat,
    pub stop_on_errors: bool,
}

/// Final counts reported by the write executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub docs_written: u64,
    pub docs_processed: u64,
}

/// A failed run still reports how far it got.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteFailure {
    pub error: ImportError,
    pub partial: WriteSummary,
}

/// Streams a source file into the destination collection.
#[async_trait]
pub trait WriteExecutor: Send + Sync {
    /// Run one import.
    ///
    /// Invokes `on_progress` periodically with the counts reached so far and
    /// `on_error` once per failed document write. With `stop_on_errors` set
    /// the executor terminates on the first document failure. Must settle
    /// even when `token` is cancelled, reporting the partial counts reached;
    /// a failure always carries the partial counts too.
    async fn run(
        &self,
        job: WriteJob,
        token: CancelToken,
        on_progress: ProgressCallback,
        on_error: DocumentErrorCallback,
    ) -> std::result::Result<WriteSummary, WriteFailure>;
}

/// The collaborators an `ImportController` drives.
#[derive(Clone)]
pub struct ImportServices {
    pub file_metadata: Arc<dyn FileMetadata>,
    pub detector: Arc<dyn FileTypeDetector>,
    pub header_lister: Arc<dyn HeaderLister>,
    pub analyzer: Arc<dyn FieldAnalyzer>,
    pub executor: Arc<dyn WriteExecutor>,
    pub events: Arc<dyn AppEventSink>,
}
