//! One export run: load the stores, trigger each requested export and
//! collect what happened.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clade_export::{
    AnalysisStore, ColumnConfigStore, DirectorySink, ErrorSlot, ExportAction, ExportKind,
    ExportOrchestrator, FileSink, SavedArtifact, SerializationWorkerClient, WorkerConfig,
};
use clade_model::{AnalysisOutcome, CsvColumnConfig, DatasetCatalog, ExportParams};
use tracing::{Instrument, info, info_span, warn};

/// Everything one run needs, already loaded.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub outcomes: Vec<AnalysisOutcome>,
    pub catalog: DatasetCatalog,
    /// Column selection; `None` starts from the catalog's layout.
    pub columns: Option<CsvColumnConfig>,
    pub params: ExportParams,
    pub worker: WorkerConfig,
    pub output_dir: PathBuf,
    /// Kinds to export, in order. Duplicates are ignored.
    pub kinds: Vec<ExportKind>,
    /// Datasets for per-dataset kinds; empty means every dataset.
    pub datasets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Written(SavedArtifact),
    /// The dataset has no data for this kind.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRow {
    pub kind: ExportKind,
    pub dataset: Option<String>,
    pub status: ArtifactStatus,
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    pub outcomes: usize,
    pub rows: Vec<ArtifactRow>,
    /// Failures recorded by the run's error slot.
    pub errors_reported: usize,
}

impl ExportReport {
    pub fn written(&self) -> impl Iterator<Item = &SavedArtifact> {
        self.rows.iter().filter_map(|row| match &row.status {
            ArtifactStatus::Written(saved) => Some(saved),
            ArtifactStatus::Skipped | ArtifactStatus::Failed(_) => None,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row.status, ArtifactStatus::Failed(_)))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}

/// Run every requested export into `request.output_dir`.
///
/// Per-dataset artifacts go into a subdirectory named after the dataset when
/// the catalog holds more than one dataset. A failed export is recorded in
/// the report and does not stop the remaining ones.
pub async fn run_export(request: ExportRequest) -> Result<ExportReport> {
    let ExportRequest {
        outcomes,
        catalog,
        columns,
        params,
        worker,
        output_dir,
        kinds,
        datasets,
    } = request;

    for name in &datasets {
        if catalog.get(name).is_none() {
            bail!("unknown dataset '{name}'");
        }
    }
    let datasets: Vec<String> = if datasets.is_empty() {
        catalog.names().map(str::to_string).collect()
    } else {
        datasets
    };
    let nested = catalog.len() > 1;
    let columns = columns.unwrap_or_else(|| catalog.column_defaults());

    let outcome_count = outcomes.len();
    let span = info_span!("run", outcomes = outcome_count, datasets = catalog.len());

    let analysis = Arc::new(AnalysisStore::new());
    analysis.extend(outcomes);
    let errors = Arc::new(ErrorSlot::new());
    let sink: Arc<dyn FileSink> = Arc::new(DirectorySink::new(&output_dir));
    let orchestrator = Arc::new(
        ExportOrchestrator::new(
            analysis,
            Arc::new(ColumnConfigStore::new(Some(columns))),
            Arc::new(catalog),
            sink,
        )
        .with_worker(SerializationWorkerClient::shared_with(worker))
        .with_error_slot(Arc::clone(&errors))
        .with_params(params)
        .with_app_version(env!("CARGO_PKG_VERSION")),
    );

    let mut unique = Vec::new();
    for kind in kinds {
        if !unique.contains(&kind) {
            unique.push(kind);
        }
    }

    let rows = async {
        let mut rows = Vec::new();
        for kind in unique {
            if !kind.is_dataset_scoped() {
                rows.push(run_one(&orchestrator, kind, None, false).await);
                continue;
            }
            for dataset in &datasets {
                rows.push(run_one(&orchestrator, kind, Some(dataset), nested).await);
            }
        }
        rows
    }
    .instrument(span.clone())
    .await;

    let report = ExportReport {
        output_dir,
        outcomes: outcome_count,
        rows,
        errors_reported: errors.report_count(),
    };
    span.in_scope(|| {
        info!(
            written = report.written().count(),
            failed = report.failed_count(),
            "run finished"
        );
    });
    Ok(report)
}

async fn run_one(
    orchestrator: &Arc<ExportOrchestrator>,
    kind: ExportKind,
    dataset: Option<&str>,
    nested: bool,
) -> ArtifactRow {
    let row = |status| ArtifactRow {
        kind,
        dataset: dataset.map(str::to_string),
        status,
    };
    let Some(action) = orchestrator.action(kind, dataset) else {
        warn!(%kind, dataset, "export not available, skipping");
        return row(ArtifactStatus::Skipped);
    };
    let filename = artifact_filename(&action, nested);
    match action.trigger(&filename).await {
        Ok(saved) => row(ArtifactStatus::Written(saved)),
        Err(error) => row(ArtifactStatus::Failed(error.user_message())),
    }
}

fn artifact_filename(action: &ExportAction, nested: bool) -> String {
    match action.dataset() {
        Some(dataset) if nested => format!("{dataset}/{}", action.default_filename()),
        _ => action.default_filename(),
    }
}
