//! The import session controller
//!
//! Owns the [`Session`] exclusively and applies every mutation as a
//! synchronous transition under one lock. File sniffing, schema analysis,
//! and the streamed write run as independent tokio tasks that report back
//! through [`ImportEvent`]s only, so no two mutations ever interleave and
//! the orchestrator never blocks a mutation on I/O.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::json;

use harbor_core::{AppEvent, Namespace};

use crate::cancel::CancelToken;
use crate::error::{ImportError, Result};
use crate::progress::{ProgressThrottle, guess_total};
use crate::schema::{build_preview_fields, merge_analysis};
use crate::services::{
    DocumentErrorCallback, FileTypeDetection, ImportServices, ProgressCallback, ProgressSample,
    WriteFormat, WriteJob,
};
use crate::session::{
    Delimiter, FileType, ImportEvent, ProcessStatus, Session, TabularType,
};

/// Tuning knobs for the controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Minimum interval between progress updates applied to the session.
    pub progress_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_secs(1),
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Drives one import session at a time against the injected services.
///
/// Cloning is cheap and yields a handle to the same session.
#[derive(Clone)]
pub struct ImportController {
    inner: Arc<Inner>,
}

struct Inner {
    session: Mutex<Session>,
    services: ImportServices,
    config: ControllerConfig,
}

impl ImportController {
    pub fn new(services: ImportServices) -> Self {
        Self::with_config(services, ControllerConfig::default())
    }

    pub fn with_config(services: ImportServices, config: ControllerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::new()),
                services,
                config,
            }),
        }
    }

    /// Snapshot of the current session for the UI layer.
    pub fn session(&self) -> Session {
        self.inner.session.lock().clone()
    }

    /// Open a new import session targeting `namespace`.
    ///
    /// While a run is in flight the session is not reset; only the
    /// "already in progress" notice is raised, closable independently via
    /// [`ImportController::close_in_progress_message`].
    #[tracing::instrument(skip(self), fields(namespace = %namespace))]
    pub fn open(&self, namespace: Namespace) {
        let mut session = self.inner.session.lock();
        if session.status == ProcessStatus::Started {
            session.apply(ImportEvent::OpenInProgressMessage);
            return;
        }
        tracing::info!("Opening import");
        session.apply(ImportEvent::Open { namespace });
    }

    pub fn close(&self) {
        self.inner.apply(ImportEvent::Close);
    }

    pub fn close_in_progress_message(&self) {
        self.inner.apply(ImportEvent::CloseInProgressMessage);
    }

    /// Manually override the detected file type.
    pub fn select_file_type(&self, file_type: FileType) {
        self.inner.apply(ImportEvent::FileTypeSelected(file_type));
    }

    pub fn set_stop_on_errors(&self, stop_on_errors: bool) {
        self.inner.apply(ImportEvent::SetStopOnErrors(stop_on_errors));
    }

    pub fn set_ignore_blanks(&self, ignore_blanks: bool) {
        self.inner.apply(ImportEvent::SetIgnoreBlanks(ignore_blanks));
    }

    /// Include or exclude the field at `path` from the written documents.
    pub fn toggle_include_field(&self, path: &str) {
        self.inner.apply(ImportEvent::ToggleIncludeField {
            path: path.to_string(),
        });
    }

    /// Set the type values at `path` are coerced to. Implies inclusion.
    pub fn set_field_type(&self, path: &str, ty: TabularType) {
        self.inner.apply(ImportEvent::SetFieldType {
            path: path.to_string(),
            ty,
        });
    }

    /// Select the source file: stat it, sniff its type, and for tabular
    /// input kick off header discovery and type analysis.
    ///
    /// Failures (missing file, undetectable type) surface as a `Failed`
    /// session status rather than propagating.
    #[tracing::instrument(skip(self))]
    pub async fn select_file(&self, file_name: &str) {
        if let Err(error) = self.try_select_file(file_name).await {
            tracing::error!(%error, "File selection failed");
            self.inner.apply(ImportEvent::Failed(error));
        }
    }

    async fn try_select_file(&self, file_name: &str) -> Result<()> {
        let services = &self.inner.services;
        let path = Path::new(file_name);
        if !services.file_metadata.exists(path).await {
            return Err(ImportError::FileNotFound(file_name.to_string()));
        }
        let stats = services.file_metadata.stat(path).await?;
        let detection = services.detector.detect(path).await?;
        tracing::debug!(?detection, "File type detected");

        let (file_type, multiline, delimiter) = match detection {
            FileTypeDetection::Csv { delimiter } => (FileType::Csv, false, Some(delimiter)),
            FileTypeDetection::Json => (FileType::Json, false, None),
            FileTypeDetection::Jsonl => (FileType::Json, true, None),
            FileTypeDetection::Unknown => return Err(ImportError::UnknownFileType),
        };

        self.inner.apply(ImportEvent::FileSelected {
            file_name: file_name.to_string(),
            file_type,
            file_size: stats.size,
            file_is_multiline_json: multiline,
            delimiter,
        });

        // preview rows and field typing only apply to tabular input
        if file_type == FileType::Csv {
            self.load_csv_preview().await;
        }
        Ok(())
    }

    /// Change the tabular delimiter and refresh the preview.
    ///
    /// An analysis already in flight is superseded: its token is cancelled
    /// before this run's first side effect (see [`Self::load_csv_preview`]).
    #[tracing::instrument(skip(self))]
    pub async fn set_delimiter(&self, delimiter: Delimiter) {
        self.inner.apply(ImportEvent::SetDelimiter(delimiter));
        let is_csv = self.inner.session.lock().file_type == Some(FileType::Csv);
        if is_csv {
            self.load_csv_preview().await;
        }
    }

    /// Run header discovery (phase A) then type analysis (phase B) for the
    /// selected file, superseding any analysis already in flight.
    async fn load_csv_preview(&self) {
        let token = CancelToken::new();
        let (file_name, delimiter, ignore_blanks) = {
            let mut session = self.inner.session.lock();
            // cancel the previous run before this one's first side effect;
            // from here on token identity decides whose results are current
            if let Some(previous) = session.analyze_abort.clone() {
                previous.cancel();
                session.apply(ImportEvent::AnalyzeCancelled);
            }
            session.apply(ImportEvent::AnalyzeStarted {
                abort: token.clone(),
            });
            (
                session.file_name.clone(),
                session.delimiter,
                session.ignore_blanks,
            )
        };
        let path = PathBuf::from(&file_name);
        let services = &self.inner.services;

        let listed = match services.header_lister.list_fields(&path, delimiter).await {
            Ok(listed) => listed,
            Err(error) => {
                tracing::error!(%error, "Failed to list header fields");
                self.apply_if_current(&token, ImportEvent::AnalyzeFailed(error.to_string()));
                return;
            }
        };
        let mut fields = build_preview_fields(&listed.header_fields);
        let values = listed.preview_rows;

        // show rows immediately; types arrive when analysis completes
        if !self.apply_if_current(
            &token,
            ImportEvent::SetPreview {
                fields: fields.clone(),
                values: values.clone(),
            },
        ) {
            return;
        }

        match services
            .analyzer
            .analyze(&path, delimiter, ignore_blanks, token.clone())
            .await
        {
            Ok(report) => {
                merge_analysis(&mut fields, &report);
                if self.apply_if_current(&token, ImportEvent::SetPreview { fields, values }) {
                    self.apply_if_current(&token, ImportEvent::AnalyzeFinished(report));
                }
            }
            Err(error) => {
                tracing::error!(%error, "Failed to analyze fields");
                self.apply_if_current(&token, ImportEvent::AnalyzeFailed(error.to_string()));
            }
        }
    }

    /// Apply `event` only while `token` is still the session's current
    /// analysis token and has not been cancelled. Returns whether it
    /// applied; a superseded task stops at the first `false`.
    fn apply_if_current(&self, token: &CancelToken, event: ImportEvent) -> bool {
        let mut session = self.inner.session.lock();
        let current = session
            .analyze_abort
            .as_ref()
            .is_some_and(|t| t.same_token(token));
        if !current || token.is_cancelled() {
            tracing::debug!("Discarding result from a superseded analysis");
            return false;
        }
        session.apply(event);
        true
    }

    /// Start the import run.
    ///
    /// Returns the handle of the background write task; the run reports
    /// back through the session, so the handle only matters to callers that
    /// want to await settlement.
    #[tracing::instrument(skip(self))]
    pub fn start(&self) -> Result<tokio::task::JoinHandle<()>> {
        let token = CancelToken::new();
        let (job, has_excluded, has_transformed) = {
            let mut session = self.inner.session.lock();
            if session.status == ProcessStatus::Started {
                return Err(ImportError::ImportInProgress);
            }
            if session.file_name.is_empty() {
                return Err(ImportError::NoFileSelected);
            }
            let file_type = session.file_type.ok_or(ImportError::UnknownFileType)?;
            let namespace = session.namespace.clone().ok_or(ImportError::NoNamespace)?;

            let ignore_blanks = session.ignore_blanks && file_type == FileType::Csv;
            let format = match file_type {
                FileType::Csv => WriteFormat::Csv {
                    delimiter: session.delimiter,
                    // effective coercion map: transformed fields minus exclusions
                    fields: session
                        .transform
                        .iter()
                        .filter(|(path, _)| !session.exclude.contains(path))
                        .cloned()
                        .collect(),
                    ignore_empty_strings: ignore_blanks,
                },
                FileType::Json => WriteFormat::Json {
                    multiline: session.file_is_multiline_json,
                },
            };
            let job = WriteJob {
                namespace,
                file_name: session.file_name.clone(),
                file_size: session.file_size.unwrap_or(0),
                format,
                stop_on_errors: session.stop_on_errors,
            };
            tracing::info!(
                namespace = %job.namespace,
                file_name = %job.file_name,
                file_size = job.file_size,
                stop_on_errors = job.stop_on_errors,
                "Start reading from source file"
            );
            let has_excluded = !session.exclude.is_empty();
            let has_transformed = !session.transform.is_empty();
            session.apply(ImportEvent::Started {
                abort: token.clone(),
            });
            (job, has_excluded, has_transformed)
        };

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move {
            inner.run_import(job, token, has_excluded, has_transformed).await;
        }))
    }

    /// Cancel the active run, if any. Safe to call repeatedly; a no-op when
    /// nothing is running.
    #[tracing::instrument(skip(self))]
    pub fn cancel(&self) {
        let mut session = self.inner.session.lock();
        let Some(abort) = session.abort.clone() else {
            tracing::debug!("No active import to cancel");
            return;
        };
        abort.cancel();
        tracing::info!("Import canceled by user");
        session.apply(ImportEvent::Canceled);
    }
}

impl Inner {
    fn apply(&self, event: ImportEvent) {
        self.session.lock().apply(event);
    }

    async fn run_import(
        self: Arc<Self>,
        job: WriteJob,
        token: CancelToken,
        has_excluded: bool,
        has_transformed: bool,
    ) {
        let started_at = Instant::now();
        let file_size = job.file_size;

        let throttle = Arc::new(Mutex::new(ProgressThrottle::new(
            self.config.progress_interval,
        )));
        let errors = Arc::new(Mutex::new(Vec::<ImportError>::new()));

        let on_error: DocumentErrorCallback = {
            let errors = Arc::clone(&errors);
            Box::new(move |error| {
                errors.lock().push(ImportError::Document(error));
            })
        };

        let on_progress: ProgressCallback = {
            let inner = Arc::clone(&self);
            let throttle = Arc::clone(&throttle);
            let errors = Arc::clone(&errors);
            let token = token.clone();
            Box::new(move |sample| {
                if let Some(sample) = throttle.lock().offer(sample) {
                    inner.apply_progress(sample, file_size, &errors, &token);
                }
            })
        };

        let result = self
            .services
            .executor
            .run(job.clone(), token.clone(), on_progress, on_error)
            .await;

        // final flush so the last true counts are never dropped
        if let Some(sample) = throttle.lock().flush() {
            self.apply_progress(sample, file_size, &errors, &token);
        }

        // errors reported between the last emitted sample and settlement
        // still have to reach the session before the status is resolved
        let partial = match &result {
            Ok(summary) => *summary,
            Err(failure) => failure.partial,
        };
        let collected = errors.lock().clone();
        if !collected.is_empty() && !token.is_cancelled() {
            self.apply(ImportEvent::Progress {
                docs_written: partial.docs_written,
                docs_processed: partial.docs_processed,
                errors: collected,
            });
        }

        match result {
            Ok(summary) => {
                self.apply(ImportEvent::Finished {
                    docs_written: summary.docs_written,
                    docs_total: summary.docs_processed,
                });
                let status = self.session.lock().status;
                tracing::info!(
                    duration_ms = started_at.elapsed().as_millis() as u64,
                    docs_written = summary.docs_written,
                    docs_processed = summary.docs_processed,
                    ?status,
                    "Import completed"
                );
                if matches!(
                    status,
                    ProcessStatus::Completed | ProcessStatus::CompletedWithErrors
                ) {
                    self.services.events.emit(import_finished_event(
                        &job,
                        summary.docs_written,
                        has_excluded,
                        has_transformed,
                    ));
                }
            }
            Err(failure) => {
                self.apply(ImportEvent::Finished {
                    docs_written: failure.partial.docs_written,
                    docs_total: failure.partial.docs_processed,
                });
                tracing::error!(
                    duration_ms = started_at.elapsed().as_millis() as u64,
                    docs_written = failure.partial.docs_written,
                    error = %failure.error,
                    "Import failed"
                );
                self.apply(ImportEvent::Failed(failure.error));
            }
        }
    }

    fn apply_progress(
        &self,
        sample: ProgressSample,
        file_size: u64,
        errors: &Mutex<Vec<ImportError>>,
        token: &CancelToken,
    ) {
        // once cancellation is acknowledged no callback may mutate the
        // session; the final counts still arrive through Finished
        if token.is_cancelled() {
            return;
        }
        let guessed = guess_total(sample.docs_processed, sample.bytes_processed, file_size);
        let mut session = self.session.lock();
        session.apply(ImportEvent::SetGuesstimatedTotal(guessed));
        session.apply(ImportEvent::GuesstimatedProgress {
            docs_processed: sample.docs_processed,
            docs_total: guessed,
        });
        session.apply(ImportEvent::Progress {
            docs_written: sample.docs_written,
            docs_processed: sample.docs_processed,
            errors: errors.lock().clone(),
        });
    }
}

/// Payload consumed by unrelated application features after a successful
/// import.
fn import_finished_event(
    job: &WriteJob,
    docs_written: u64,
    has_excluded: bool,
    has_transformed: bool,
) -> AppEvent {
    let (file_type, delimiter, ignore_blanks, multiline) = match &job.format {
        WriteFormat::Csv {
            delimiter,
            ignore_empty_strings,
            ..
        } => (FileType::Csv, Some(delimiter.as_char()), *ignore_empty_strings, false),
        WriteFormat::Json { multiline } => (FileType::Json, None, false, *multiline),
    };
    AppEvent::new(
        "import-finished",
        json!({
            "namespace": job.namespace.to_string(),
            "fileSize": job.file_size,
            "fileType": file_type,
            "docsWritten": docs_written,
            "fileIsMultilineJSON": multiline,
            "delimiter": delimiter,
            "ignoreBlanks": ignore_blanks,
            "stopOnErrors": job.stop_on_errors,
            "hasExcluded": has_excluded,
            "hasTransformed": has_transformed,
        }),
    )
}
