//! Harbor import session orchestrator
//!
//! Drives a single bulk ingestion run (a CSV or JSON/JSONL file into a
//! document collection) through file-type detection, schema inference,
//! user-adjustable field selection and typing, streamed write-with-progress,
//! cancellation, and completion accounting.
//!
//! # Architecture
//!
//! ```text
//! UI commands → ImportController ── apply ──> Session (pure transitions)
//!                     │ spawns                    ↑ events
//!                     ▼                           │
//!     detector / header lister / analyzer / write executor
//! ```
//!
//! The controller owns the session exclusively and serializes every
//! mutation; the external collaborators behind the [`ImportServices`] traits
//! run as independent async tasks and report back through events only.
//!
//! # Example
//!
//! ```rust,ignore
//! let controller = ImportController::new(services);
//! controller.open("shop.orders".parse()?);
//! controller.select_file("/tmp/orders.csv").await;
//! controller.set_field_type("price", TabularType::Double);
//! let run = controller.start()?;
//! ```

mod cancel;
mod controller;
mod error;
mod progress;
mod schema;
mod services;
mod session;

pub use cancel::CancelToken;
pub use controller::{ControllerConfig, ImportController};
pub use error::{DocumentError, ImportError, Result};
pub use progress::{ProgressThrottle, guess_total};
pub use schema::{build_preview_fields, field_path_for_header, merge_analysis};
pub use services::{
    AnalysisReport, DocumentErrorCallback, FieldAnalysis, FieldAnalyzer, FileMetadata, FileStats,
    FileTypeDetection, FileTypeDetector, HeaderList, HeaderLister, ImportServices,
    LocalFileMetadata, ProgressCallback, ProgressSample, WriteExecutor, WriteFailure, WriteFormat,
    WriteJob, WriteSummary,
};
pub use session::{
    Delimiter, Field, FileType, ImportEvent, ProcessStatus, Session, TabularType,
};
