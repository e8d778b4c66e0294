//! Session state and the pure event transition for one import attempt
//!
//! All mutation goes through [`Session::apply`], a synchronous transition
//! over a tagged event type. The controller serializes calls to it; the
//! transition itself needs no async machinery and is tested without any.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use harbor_core::Namespace;

use crate::cancel::CancelToken;
use crate::error::ImportError;
use crate::services::{AnalysisReport, FieldAnalysis};

/// Accepted source file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Json,
}

impl FileType {
    pub fn all() -> &'static [Self] {
        &[Self::Csv, Self::Json]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Json => "JSON",
        }
    }
}

/// Field delimiters the tabular reader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Semicolon,
    Space,
}

impl Delimiter {
    pub fn all() -> &'static [Self] {
        &[Self::Comma, Self::Tab, Self::Semicolon, Self::Space]
    }

    pub fn as_char(&self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab => '\t',
            Self::Semicolon => ';',
            Self::Space => ' ',
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Comma => "Comma",
            Self::Tab => "Tab",
            Self::Semicolon => "Semicolon",
            Self::Space => "Space",
        }
    }
}

/// Types a tabular column can be coerced to by the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularType {
    /// Pre-analysis default; the writer coerces each value independently.
    Mixed,
    String,
    Int32,
    Int64,
    Double,
    Boolean,
    Date,
    Null,
    /// Analyzer sentinel for a column that is entirely blank while blank
    /// values are ignored. Substituted with `Null` before it reaches a
    /// field, so users never see it in the type selector.
    Undefined,
}

impl TabularType {
    pub fn all() -> &'static [Self] {
        &[
            Self::Mixed,
            Self::String,
            Self::Int32,
            Self::Int64,
            Self::Double,
            Self::Boolean,
            Self::Date,
            Self::Null,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Mixed => "Mixed",
            Self::String => "String",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Double => "Double",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Null => "Null",
            Self::Undefined => "Undefined",
        }
    }
}

/// Lifecycle status shared by the import run and the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessStatus {
    #[default]
    Unspecified,
    Started,
    Canceled,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl ProcessStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::Completed | Self::CompletedWithErrors | Self::Failed
        )
    }
}

/// One column/path candidate for inclusion in the written documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// A typed tabular column.
    Csv {
        path: String,
        checked: bool,
        ty: TabularType,
        analysis: Option<FieldAnalysis>,
    },
    /// A top-level JSON field; its type is implicit in the document.
    Json { path: String, checked: bool },
    /// A non-first element of a detected array column, folded into its first
    /// sibling. Never checkable, never independently typed.
    Placeholder { path: String },
}

impl Field {
    pub fn path(&self) -> &str {
        match self {
            Self::Csv { path, .. } | Self::Json { path, .. } | Self::Placeholder { path } => path,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    /// Inclusion state; `None` for placeholders, which have none.
    pub fn checked(&self) -> Option<bool> {
        match self {
            Self::Csv { checked, .. } | Self::Json { checked, .. } => Some(*checked),
            Self::Placeholder { .. } => None,
        }
    }
}

/// Events that drive the session transition.
///
/// UI commands and the async tasks both funnel into this one type so every
/// mutation is an atomic, ordered step.
#[derive(Debug, Clone)]
pub enum ImportEvent {
    Open {
        namespace: Namespace,
    },
    Close,
    OpenInProgressMessage,
    CloseInProgressMessage,
    FileTypeSelected(FileType),
    FileSelected {
        file_name: String,
        file_type: FileType,
        file_size: u64,
        file_is_multiline_json: bool,
        /// Detected for tabular input; `None` keeps the current delimiter.
        delimiter: Option<Delimiter>,
    },
    SetDelimiter(Delimiter),
    SetStopOnErrors(bool),
    SetIgnoreBlanks(bool),
    SetPreview {
        fields: Vec<Field>,
        values: Vec<Vec<String>>,
    },
    ToggleIncludeField {
        path: String,
    },
    SetFieldType {
        path: String,
        ty: TabularType,
    },
    Started {
        abort: CancelToken,
    },
    SetGuesstimatedTotal(u64),
    GuesstimatedProgress {
        docs_processed: u64,
        docs_total: u64,
    },
    Progress {
        docs_written: u64,
        docs_processed: u64,
        errors: Vec<ImportError>,
    },
    Finished {
        docs_written: u64,
        docs_total: u64,
    },
    Failed(ImportError),
    Canceled,
    AnalyzeStarted {
        abort: CancelToken,
    },
    AnalyzeFinished(AnalysisReport),
    AnalyzeFailed(String),
    AnalyzeCancelled,
}

/// The full mutable state of one import attempt.
///
/// Created fresh on `Open`, reset on file selection, and mutated only by
/// [`Session::apply`]. The controller owns it exclusively; nothing else
/// holds a reference.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub namespace: Option<Namespace>,
    pub is_open: bool,
    pub is_in_progress_message_open: bool,
    pub errors: Vec<ImportError>,
    pub file_name: String,
    pub file_type: Option<FileType>,
    pub file_is_multiline_json: bool,
    pub file_size: Option<u64>,
    pub status: ProcessStatus,

    pub docs_total: Option<u64>,
    pub docs_processed: u64,
    pub docs_written: u64,
    pub guesstimated_docs_total: u64,
    pub guesstimated_docs_processed: u64,
    pub delimiter: Delimiter,
    pub stop_on_errors: bool,
    pub ignore_blanks: bool,

    pub fields: Vec<Field>,
    pub values: Vec<Vec<String>>,
    pub preview_loaded: bool,
    /// Unchecked non-placeholder paths. Derived; never edited directly.
    pub exclude: Vec<String>,
    /// Ordered `(path, type)` pairs of the checked tabular fields. Derived;
    /// never edited directly.
    pub transform: Vec<(String, TabularType)>,

    pub abort: Option<CancelToken>,
    pub analyze_abort: Option<CancelToken>,
    pub analyze_status: ProcessStatus,
    pub analyze_result: Option<AnalysisReport>,
    pub analyze_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            namespace: None,
            is_open: false,
            is_in_progress_message_open: false,
            errors: Vec::new(),
            file_name: String::new(),
            file_type: None,
            file_is_multiline_json: false,
            file_size: None,
            status: ProcessStatus::Unspecified,
            docs_total: None,
            docs_processed: 0,
            docs_written: 0,
            guesstimated_docs_total: 0,
            guesstimated_docs_processed: 0,
            delimiter: Delimiter::Comma,
            stop_on_errors: false,
            ignore_blanks: true,
            fields: Vec::new(),
            values: Vec::new(),
            preview_loaded: false,
            exclude: Vec::new(),
            transform: Vec::new(),
            abort: None,
            analyze_abort: None,
            analyze_status: ProcessStatus::Unspecified,
            analyze_result: None,
            analyze_error: None,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Synchronous and total: unknown paths and edits on
    /// placeholders fall through as no-ops.
    pub fn apply(&mut self, event: ImportEvent) {
        match event {
            ImportEvent::Open { namespace } => {
                *self = Session {
                    namespace: Some(namespace),
                    is_open: true,
                    ..Session::default()
                };
            }
            ImportEvent::Close => {
                self.is_open = false;
            }
            ImportEvent::OpenInProgressMessage => {
                self.is_in_progress_message_open = true;
            }
            ImportEvent::CloseInProgressMessage => {
                self.is_in_progress_message_open = false;
            }
            ImportEvent::FileTypeSelected(file_type) => {
                self.file_type = Some(file_type);
            }
            ImportEvent::FileSelected {
                file_name,
                file_type,
                file_size,
                file_is_multiline_json,
                delimiter,
            } => {
                self.file_name = file_name;
                self.file_type = Some(file_type);
                self.file_size = Some(file_size);
                self.file_is_multiline_json = file_is_multiline_json;
                if let Some(delimiter) = delimiter {
                    self.delimiter = delimiter;
                }
                self.status = ProcessStatus::Unspecified;
                self.docs_total = None;
                self.docs_processed = 0;
                self.docs_written = 0;
                self.guesstimated_docs_total = 0;
                self.guesstimated_docs_processed = 0;
                self.errors.clear();
                self.abort = None;
                self.analyze_abort = None;
                // schema state is replaced as one unit
                self.fields.clear();
                self.values.clear();
                self.exclude.clear();
                self.transform.clear();
                self.preview_loaded = false;
            }
            ImportEvent::SetDelimiter(delimiter) => {
                self.delimiter = delimiter;
            }
            ImportEvent::SetStopOnErrors(stop_on_errors) => {
                self.stop_on_errors = stop_on_errors;
            }
            ImportEvent::SetIgnoreBlanks(ignore_blanks) => {
                self.ignore_blanks = ignore_blanks;
            }
            ImportEvent::SetPreview { fields, values } => {
                self.fields = fields;
                self.values = values;
                self.preview_loaded = true;
                // a fresh preview starts fully included
                self.exclude.clear();
                self.recompute_transform();
            }
            ImportEvent::ToggleIncludeField { path } => {
                for field in &mut self.fields {
                    match field {
                        Field::Csv {
                            path: p, checked, ..
                        }
                        | Field::Json {
                            path: p, checked, ..
                        } if *p == path => {
                            *checked = !*checked;
                        }
                        _ => {}
                    }
                }
                self.recompute_transform();
                self.recompute_exclude();
            }
            ImportEvent::SetFieldType { path, ty } => {
                for field in &mut self.fields {
                    // only tabular fields carry a type
                    if let Field::Csv {
                        path: p,
                        checked,
                        ty: t,
                        ..
                    } = field
                        && *p == path
                    {
                        // an explicit type choice implies inclusion
                        *checked = true;
                        *t = ty;
                    }
                }
                self.recompute_transform();
                self.recompute_exclude();
            }
            ImportEvent::Started { abort } => {
                self.errors.clear();
                self.docs_total = None;
                self.docs_processed = 0;
                self.docs_written = 0;
                self.guesstimated_docs_total = 0;
                self.guesstimated_docs_processed = 0;
                self.status = ProcessStatus::Started;
                self.abort = Some(abort);
            }
            ImportEvent::SetGuesstimatedTotal(total) => {
                self.guesstimated_docs_total = self.guesstimated_docs_total.max(total);
            }
            ImportEvent::GuesstimatedProgress {
                docs_processed,
                docs_total,
            } => {
                self.guesstimated_docs_processed =
                    self.guesstimated_docs_processed.max(docs_processed);
                self.guesstimated_docs_total = self.guesstimated_docs_total.max(docs_total);
            }
            ImportEvent::Progress {
                docs_written,
                docs_processed,
                errors,
            } => {
                self.docs_written = self.docs_written.max(docs_written);
                self.docs_processed = self.docs_processed.max(docs_processed);
                self.errors = errors;
            }
            ImportEvent::Finished {
                docs_written,
                docs_total,
            } => {
                // cancellation is terminal; a late completion does not
                // override it
                if self.status != ProcessStatus::Canceled {
                    self.status = if self.errors.is_empty() {
                        ProcessStatus::Completed
                    } else {
                        ProcessStatus::CompletedWithErrors
                    };
                }
                self.docs_written = self.docs_written.max(docs_written);
                self.docs_total = Some(self.docs_total.unwrap_or(0).max(docs_total));
                self.abort = None;
            }
            ImportEvent::Failed(error) => {
                if !self.errors.contains(&error) {
                    self.errors.push(error);
                }
                self.status = ProcessStatus::Failed;
                self.abort = None;
            }
            ImportEvent::Canceled => {
                self.status = ProcessStatus::Canceled;
                self.abort = None;
            }
            ImportEvent::AnalyzeStarted { abort } => {
                self.analyze_status = ProcessStatus::Started;
                self.analyze_abort = Some(abort);
                self.analyze_error = None;
            }
            ImportEvent::AnalyzeFinished(report) => {
                self.analyze_status = ProcessStatus::Completed;
                self.analyze_abort = None;
                self.analyze_result = Some(report);
                self.analyze_error = None;
            }
            ImportEvent::AnalyzeFailed(error) => {
                self.analyze_status = ProcessStatus::Failed;
                self.analyze_abort = None;
                self.analyze_error = Some(error);
            }
            ImportEvent::AnalyzeCancelled => {
                self.analyze_status = ProcessStatus::Canceled;
                self.analyze_abort = None;
                self.analyze_error = None;
            }
        }
    }

    fn recompute_transform(&mut self) {
        self.transform = self
            .fields
            .iter()
            .filter_map(|field| match field {
                Field::Csv {
                    path,
                    checked: true,
                    ty,
                    ..
                } => Some((path.clone(), *ty)),
                _ => None,
            })
            .collect();
    }

    fn recompute_exclude(&mut self) {
        self.exclude = self
            .fields
            .iter()
            .filter_map(|field| match field {
                Field::Csv {
                    path,
                    checked: false,
                    ..
                }
                | Field::Json {
                    path,
                    checked: false,
                } => Some(path.clone()),
                _ => None,
            })
            .collect();
    }
}
