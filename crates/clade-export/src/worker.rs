//! Background serialization worker.
//!
//! Formatting large result sets is CPU bound, so it runs on one dedicated OS
//! thread. The thread is spawned on the first request and then reused for
//! the lifetime of the client; requests are answered in the order they
//! arrive. A formatter that panics fails only the job it was running.
//!
//! ```text
//! async caller ──FormatJob──▶ mpsc ──▶ worker thread ──▶ ResultFormatter
//!      ▲                                     │
//!      └────────────── oneshot reply ◀───────┘
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clade_model::{AnalysisResult, CsvColumnConfig, Descriptors, FailureOutcome};
use clade_output::{ExcelSheet, FormatError};
use tokio::sync::{OnceCell, mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{ExportError, Result};

/// Configuration for the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub thread_name: String,

    /// Upper bound on waiting for one reply. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: "clade-export-worker".to_string(),
            call_timeout: None,
        }
    }
}

/// One formatting request with all of its input owned.
#[derive(Debug, Clone)]
pub enum FormatJob {
    ResultsCsv {
        results: Vec<AnalysisResult>,
        errors: Vec<FailureOutcome>,
        descriptors: Descriptors,
        config: CsvColumnConfig,
        delimiter: u8,
    },
    ResultsJson {
        results: Vec<AnalysisResult>,
        errors: Vec<FailureOutcome>,
        descriptors: Descriptors,
        app_version: Option<String>,
    },
    ResultsNdjson {
        results: Vec<AnalysisResult>,
        errors: Vec<FailureOutcome>,
    },
    ResultsExcel {
        sheets: Vec<ExcelSheet>,
        config: CsvColumnConfig,
    },
    ResultsGff {
        results: Vec<AnalysisResult>,
    },
    ResultsTbl {
        results: Vec<AnalysisResult>,
    },
    UnknownCsv {
        errors: Vec<FailureOutcome>,
        delimiter: u8,
    },
}

impl FormatJob {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResultsCsv { .. } => "results-csv",
            Self::ResultsJson { .. } => "results-json",
            Self::ResultsNdjson { .. } => "results-ndjson",
            Self::ResultsExcel { .. } => "results-excel",
            Self::ResultsGff { .. } => "results-gff",
            Self::ResultsTbl { .. } => "results-tbl",
            Self::UnknownCsv { .. } => "unknown-csv",
        }
    }
}

/// Turns a [`FormatJob`] into the artifact text.
///
/// Runs on the worker thread. Excel output is returned base64-encoded.
pub trait ResultFormatter: Send + Sync + 'static {
    fn format(&self, job: FormatJob) -> std::result::Result<String, FormatError>;
}

/// Formatter backed by the `clade-output` writers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormatter;

impl ResultFormatter for StandardFormatter {
    fn format(&self, job: FormatJob) -> std::result::Result<String, FormatError> {
        match job {
            FormatJob::ResultsCsv {
                results,
                errors,
                descriptors,
                config,
                delimiter,
            } => clade_output::results_to_csv_string(&results, &errors, &descriptors, &config, delimiter),
            FormatJob::ResultsJson {
                results,
                errors,
                descriptors,
                app_version,
            } => clade_output::results_to_json_string(
                &results,
                &errors,
                &descriptors,
                app_version.as_deref(),
            ),
            FormatJob::ResultsNdjson { results, errors } => {
                clade_output::results_to_ndjson_string(&results, &errors)
            }
            FormatJob::ResultsExcel { sheets, config } => {
                let bytes = clade_output::results_to_excel_bytes(&sheets, &config)?;
                Ok(STANDARD.encode(bytes))
            }
            FormatJob::ResultsGff { results } => clade_output::results_to_gff_string(&results),
            FormatJob::ResultsTbl { results } => clade_output::results_to_tbl_string(&results),
            FormatJob::UnknownCsv { errors, delimiter } => {
                clade_output::unclassified_to_csv_string(&errors, delimiter)
            }
        }
    }
}

struct Envelope {
    job: FormatJob,
    reply: oneshot::Sender<std::result::Result<String, FormatError>>,
}

static SHARED: OnceLock<Arc<SerializationWorkerClient>> = OnceLock::new();

/// Handle to the single background worker.
pub struct SerializationWorkerClient {
    config: WorkerConfig,
    formatter: Arc<dyn ResultFormatter>,
    sender: OnceCell<mpsc::UnboundedSender<Envelope>>,
}

impl std::fmt::Debug for SerializationWorkerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationWorkerClient")
            .field("config", &self.config)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

impl SerializationWorkerClient {
    pub(crate) fn new(config: WorkerConfig) -> Self {
        Self::with_formatter(config, StandardFormatter)
    }

    pub fn with_formatter(config: WorkerConfig, formatter: impl ResultFormatter) -> Self {
        Self {
            config,
            formatter: Arc::new(formatter),
            sender: OnceCell::new(),
        }
    }

    /// The process-wide client.
    pub fn shared() -> Arc<Self> {
        Self::shared_with(WorkerConfig::default())
    }

    /// The process-wide client, created with `config` if nothing has asked
    /// for it yet. Later calls get the existing client unchanged.
    pub fn shared_with(config: WorkerConfig) -> Arc<Self> {
        let mut requested = Some(config);
        let client = SHARED.get_or_init(|| {
            let config = requested.take().unwrap_or_default();
            Arc::new(Self::new(config))
        });
        if let Some(config) = requested
            && config != client.config
        {
            debug!(
                requested = ?config,
                active = ?client.config,
                "serialization worker already configured"
            );
        }
        Arc::clone(client)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Whether the worker thread has been spawned.
    pub fn is_started(&self) -> bool {
        self.sender.initialized()
    }

    async fn sender(&self) -> Result<&mpsc::UnboundedSender<Envelope>> {
        self.sender
            .get_or_try_init(|| async {
                let (sender, receiver) = mpsc::unbounded_channel();
                let formatter = Arc::clone(&self.formatter);
                thread::Builder::new()
                    .name(self.config.thread_name.clone())
                    .spawn(move || run_worker(receiver, formatter.as_ref()))
                    .map_err(|error| {
                        warn!(%error, "failed to spawn serialization worker");
                        ExportError::WorkerUnavailable
                    })?;
                debug!(thread = %self.config.thread_name, "started serialization worker");
                Ok::<_, ExportError>(sender)
            })
            .await
    }

    async fn call(&self, job: FormatJob) -> Result<String> {
        let name = job.name();
        let sender = self.sender().await?;
        let (reply, response) = oneshot::channel();
        sender
            .send(Envelope { job, reply })
            .map_err(|_| ExportError::WorkerUnavailable)?;

        let received = match self.config.call_timeout {
            Some(timeout) => tokio::time::timeout(timeout, response)
                .await
                .map_err(|_| ExportError::WorkerTimeout { job: name, timeout })?,
            None => response.await,
        };
        let formatted = received.map_err(|_| ExportError::WorkerUnavailable)?;
        Ok(formatted?)
    }

    pub async fn serialize_results_csv(
        &self,
        results: Vec<AnalysisResult>,
        errors: Vec<FailureOutcome>,
        descriptors: Descriptors,
        config: CsvColumnConfig,
        delimiter: u8,
    ) -> Result<String> {
        self.call(FormatJob::ResultsCsv {
            results,
            errors,
            descriptors,
            config,
            delimiter,
        })
        .await
    }

    pub async fn serialize_results_json(
        &self,
        results: Vec<AnalysisResult>,
        errors: Vec<FailureOutcome>,
        descriptors: Descriptors,
        app_version: Option<String>,
    ) -> Result<String> {
        self.call(FormatJob::ResultsJson {
            results,
            errors,
            descriptors,
            app_version,
        })
        .await
    }

    pub async fn serialize_results_ndjson(
        &self,
        results: Vec<AnalysisResult>,
        errors: Vec<FailureOutcome>,
    ) -> Result<String> {
        self.call(FormatJob::ResultsNdjson { results, errors }).await
    }

    /// Returns the workbook bytes base64-encoded.
    pub async fn serialize_results_excel(
        &self,
        sheets: Vec<ExcelSheet>,
        config: CsvColumnConfig,
    ) -> Result<String> {
        self.call(FormatJob::ResultsExcel { sheets, config }).await
    }

    pub async fn serialize_results_gff(&self, results: Vec<AnalysisResult>) -> Result<String> {
        self.call(FormatJob::ResultsGff { results }).await
    }

    pub async fn serialize_results_tbl(&self, results: Vec<AnalysisResult>) -> Result<String> {
        self.call(FormatJob::ResultsTbl { results }).await
    }

    pub async fn serialize_unknown_csv(
        &self,
        errors: Vec<FailureOutcome>,
        delimiter: u8,
    ) -> Result<String> {
        self.call(FormatJob::UnknownCsv { errors, delimiter }).await
    }
}

fn run_worker(mut receiver: mpsc::UnboundedReceiver<Envelope>, formatter: &dyn ResultFormatter) {
    while let Some(Envelope { job, reply }) = receiver.blocking_recv() {
        let name = job.name();
        debug!(job = name, "formatting");
        let formatted = panic::catch_unwind(AssertUnwindSafe(|| formatter.format(job)))
            .unwrap_or_else(|payload| Err(FormatError::Panicked(panic_message(&*payload))));
        if let Err(error) = &formatted {
            warn!(job = name, %error, "formatting failed");
        }
        if reply.send(formatted).is_err() {
            debug!(job = name, "caller stopped waiting for reply");
        }
    }
    debug!("serialization worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
