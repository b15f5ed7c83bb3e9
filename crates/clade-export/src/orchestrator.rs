//! Per-format export orchestration.
//!
//! Every export follows the same steps:
//!
//! 1. Snapshot the outcomes and the column configuration.
//! 2. Partition them for the dataset, or for the whole run.
//! 3. Have the worker format them.
//! 4. Hand the artifact to the [`FileSink`].
//!
//! The combined zip export formats all tabular outputs concurrently and
//! saves nothing unless every one of them succeeds.

use std::sync::Arc;

use clade_model::{
    AnalysisResult, CsvColumnConfig, DatasetBundle, DatasetCatalog, Descriptors, ExportParams,
    FailureOutcome, Partitioned, SuccessOutcome, ZipEntries, ZipEntry, dataset_names, mime,
    outcomes_without_dataset_suggestion, partition_by_dataset, partition_by_outcome,
};
use clade_output::{CSV_DELIMITER, ExcelSheet, FormatError, TSV_DELIMITER};
use tracing::{Instrument, debug, info, info_span};

use crate::action::ExportAction;
use crate::error::{ExportError, Result};
use crate::error_slot::ErrorSlot;
use crate::kind::ExportKind;
use crate::sink::{FileSink, SavedArtifact};
use crate::store::{AnalysisStore, ColumnConfigStore};
use crate::worker::SerializationWorkerClient;

const UNCLASSIFIED_SHEET: &str = "unclassified";

/// Outcomes selected for one export together with the descriptors that
/// shape their columns.
struct Selection {
    partitioned: Partitioned,
    descriptors: Descriptors,
}

impl Selection {
    fn results(&self) -> Vec<AnalysisResult> {
        results_of(&self.partitioned)
    }

    fn errors(&self) -> Vec<FailureOutcome> {
        self.partitioned.failures.clone()
    }
}

fn results_of(partitioned: &Partitioned) -> Vec<AnalysisResult> {
    partitioned
        .successes
        .iter()
        .map(|success| success.analysis_result.clone())
        .collect()
}

pub struct ExportOrchestrator {
    analysis: Arc<AnalysisStore>,
    columns: Arc<ColumnConfigStore>,
    catalog: Arc<DatasetCatalog>,
    sink: Arc<dyn FileSink>,
    worker: Arc<SerializationWorkerClient>,
    errors: Arc<ErrorSlot>,
    params: ExportParams,
    app_version: Option<String>,
}

impl std::fmt::Debug for ExportOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportOrchestrator")
            .field("outcomes", &self.analysis.len())
            .field("datasets", &self.catalog.len())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ExportOrchestrator {
    /// Orchestrator using the shared worker, the global error slot and the
    /// default filenames.
    pub fn new(
        analysis: Arc<AnalysisStore>,
        columns: Arc<ColumnConfigStore>,
        catalog: Arc<DatasetCatalog>,
        sink: Arc<dyn FileSink>,
    ) -> Self {
        Self {
            analysis,
            columns,
            catalog,
            sink,
            worker: SerializationWorkerClient::shared(),
            errors: ErrorSlot::global(),
            params: ExportParams::default(),
            app_version: None,
        }
    }

    pub fn with_worker(mut self, worker: Arc<SerializationWorkerClient>) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_error_slot(mut self, errors: Arc<ErrorSlot>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_params(mut self, params: ExportParams) -> Self {
        self.params = params;
        self
    }

    /// Version of the embedding application, recorded in JSON output.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    pub fn params(&self) -> &ExportParams {
        &self.params
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    pub fn error_slot(&self) -> &ErrorSlot {
        &self.errors
    }

    /// Whether `kind` can be exported for `dataset`.
    ///
    /// Tree, Newick and peptide exports are offered only when the dataset
    /// carries that data. Run-wide exports are always available.
    pub fn availability(&self, kind: ExportKind, dataset: Option<&str>) -> bool {
        if !kind.is_dataset_scoped() {
            return true;
        }
        let Ok(bundle) = self.resolve_dataset(kind, dataset) else {
            return false;
        };
        match kind {
            ExportKind::Tree => bundle.has_tree(),
            ExportKind::TreeNwk => bundle.has_tree_nwk(),
            ExportKind::Peptides => bundle.has_peptides(),
            _ => true,
        }
    }

    /// An action bound to a fresh run state, or `None` when unavailable.
    pub fn action(self: &Arc<Self>, kind: ExportKind, dataset: Option<&str>) -> Option<ExportAction> {
        self.availability(kind, dataset)
            .then(|| ExportAction::new(Arc::clone(self), kind, dataset.map(str::to_string)))
    }

    fn resolve_dataset(&self, kind: ExportKind, dataset: Option<&str>) -> Result<&DatasetBundle> {
        match dataset {
            Some(name) => Ok(self.catalog.require(name)?),
            None if self.catalog.len() == 1 => self
                .catalog
                .iter()
                .next()
                .ok_or(ExportError::DatasetRequired { kind }),
            None => Err(ExportError::DatasetRequired { kind }),
        }
    }

    /// Run the export for `kind`.
    ///
    /// `dataset` may be omitted for per-dataset kinds when the catalog holds
    /// a single dataset; it is ignored for run-wide kinds.
    pub async fn export(
        &self,
        kind: ExportKind,
        dataset: Option<&str>,
        filename: &str,
    ) -> Result<SavedArtifact> {
        let dataset = if kind.is_dataset_scoped() {
            Some(self.resolve_dataset(kind, dataset)?.name.clone())
        } else {
            None
        };
        let span = info_span!("export", %kind, dataset = dataset.as_deref().unwrap_or("*"));

        async {
            let name = dataset.as_deref().unwrap_or_default();
            let saved = match kind {
                ExportKind::Csv => self.export_csv(name, filename).await,
                ExportKind::Tsv => self.export_tsv(name, filename).await,
                ExportKind::Json => self.export_json(name, filename).await,
                ExportKind::Ndjson => self.export_ndjson(name, filename).await,
                ExportKind::Fasta => self.export_fasta(name, filename).await,
                ExportKind::Peptides => self.export_peptides(name, filename).await,
                ExportKind::Tree => self.export_tree(name, filename).await,
                ExportKind::TreeNwk => self.export_tree_nwk(name, filename).await,
                ExportKind::Gff => self.export_gff(name, filename).await,
                ExportKind::Tbl => self.export_tbl(name, filename).await,
                ExportKind::Excel => self.export_excel(filename).await,
                ExportKind::Unclassified => self.export_unclassified(filename).await,
                ExportKind::Zip => self.export_zip(filename).await,
            }?;
            info!(filename = %saved.filename, bytes = saved.bytes, "export finished");
            Ok::<_, ExportError>(saved)
        }
        .instrument(span)
        .await
    }

    pub async fn export_csv(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let selection = self.select_dataset(dataset)?;
        let csv = self.format_csv(&selection, CSV_DELIMITER).await?;
        self.save_text(csv, filename, mime::CSV).await
    }

    pub async fn export_tsv(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let selection = self.select_dataset(dataset)?;
        let tsv = self.format_csv(&selection, TSV_DELIMITER).await?;
        self.save_text(tsv, filename, mime::TSV).await
    }

    pub async fn export_json(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let selection = self.select_dataset(dataset)?;
        let json = self.format_json(&selection).await?;
        self.save_text(json, filename, mime::JSON).await
    }

    pub async fn export_ndjson(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let selection = self.select_dataset(dataset)?;
        let ndjson = self.format_ndjson(&selection).await?;
        self.save_text(ndjson, filename, mime::NDJSON).await
    }

    pub async fn export_fasta(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let selection = self.select_dataset(dataset)?;
        let fasta = aligned_fasta(&selection.partitioned.successes);
        self.save_text(fasta, filename, mime::FASTA).await
    }

    pub async fn export_peptides(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let bundle = self.catalog.require(dataset)?;
        if !bundle.has_peptides() {
            return Err(ExportError::Unavailable {
                kind: ExportKind::Peptides,
                dataset: dataset.to_string(),
            });
        }
        let selection = self.select_dataset(dataset)?;
        let entries = self.peptide_entries(&selection.partitioned.successes);
        self.save_zip(entries, filename).await
    }

    pub async fn export_tree(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let bundle = self.catalog.require(dataset)?;
        let json = tree_json(bundle)?.ok_or_else(|| ExportError::Unavailable {
            kind: ExportKind::Tree,
            dataset: dataset.to_string(),
        })?;
        self.save_text(json, filename, mime::JSON).await
    }

    pub async fn export_tree_nwk(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let bundle = self.catalog.require(dataset)?;
        let nwk = tree_nwk(bundle).ok_or_else(|| ExportError::Unavailable {
            kind: ExportKind::TreeNwk,
            dataset: dataset.to_string(),
        })?;
        self.save_text(nwk, filename, mime::NEWICK).await
    }

    pub async fn export_gff(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let selection = self.select_dataset(dataset)?;
        let gff = self.worker.serialize_results_gff(selection.results()).await?;
        self.save_text(gff, filename, mime::GFF).await
    }

    pub async fn export_tbl(&self, dataset: &str, filename: &str) -> Result<SavedArtifact> {
        let selection = self.select_dataset(dataset)?;
        let tbl = self.worker.serialize_results_tbl(selection.results()).await?;
        self.save_text(tbl, filename, mime::TBL).await
    }

    /// Workbook with one sheet per dataset, plus one for unclassified failures.
    pub async fn export_excel(&self, filename: &str) -> Result<SavedArtifact> {
        let config = self.column_config()?;
        let outcomes = self.analysis.snapshot();

        let mut sheets: Vec<ExcelSheet> = dataset_names(&outcomes)
            .into_iter()
            .map(|name| {
                let partitioned = partition_by_outcome(&partition_by_dataset(&outcomes, &name));
                let descriptors = self
                    .catalog
                    .get(&name)
                    .map(|bundle| bundle.descriptors.clone())
                    .unwrap_or_default();
                ExcelSheet {
                    results: results_of(&partitioned),
                    errors: partitioned.failures,
                    name,
                    descriptors,
                }
            })
            .collect();
        let unclassified = outcomes_without_dataset_suggestion(&outcomes);
        if !unclassified.is_empty() {
            sheets.push(ExcelSheet {
                name: UNCLASSIFIED_SHEET.to_string(),
                results: Vec::new(),
                errors: unclassified,
                descriptors: self.catalog.merged_descriptors(),
            });
        }
        debug!(sheets = sheets.len(), "prepared workbook");

        let encoded = self
            .worker
            .serialize_results_excel(sheets, CsvColumnConfig::clone(&config))
            .await?;
        let filename = filename.to_string();
        self.on_sink(move |sink| sink.save_base64_file(&encoded, &filename, mime::EXCEL))
            .await
    }

    /// Failures that were never assigned a dataset, as TSV.
    pub async fn export_unclassified(&self, filename: &str) -> Result<SavedArtifact> {
        let outcomes = self.analysis.snapshot();
        let errors = outcomes_without_dataset_suggestion(&outcomes);
        let tsv = self.worker.serialize_unknown_csv(errors, TSV_DELIMITER).await?;
        self.save_text(tsv, filename, mime::TSV).await
    }

    /// Everything for the whole run in one archive.
    ///
    /// Tree files are stored under `{dataset}/` when the catalog holds more
    /// than one dataset. GFF and feature table entries are left out when
    /// empty.
    pub async fn export_zip(&self, filename: &str) -> Result<SavedArtifact> {
        let selection = self.select_run();
        let (csv, tsv, json, ndjson, gff, tbl) = tokio::try_join!(
            self.format_csv(&selection, CSV_DELIMITER),
            self.format_csv(&selection, TSV_DELIMITER),
            self.format_json(&selection),
            self.format_ndjson(&selection),
            self.worker.serialize_results_gff(selection.results()),
            self.worker.serialize_results_tbl(selection.results()),
        )?;

        let params = &self.params;
        let successes = &selection.partitioned.successes;
        let mut entries = self.peptide_entries(successes);
        entries.push_text(&params.filename_csv, csv);
        entries.push_text(&params.filename_tsv, tsv);
        entries.push_text(&params.filename_json, json);
        entries.push_text(&params.filename_ndjson, ndjson);
        entries.push_text(&params.filename_fasta, aligned_fasta(successes));

        let nested = self.catalog.len() > 1;
        for bundle in self.catalog.iter() {
            let prefix = if nested {
                format!("{}/", bundle.name)
            } else {
                String::new()
            };
            if let Some(json) = tree_json(bundle)? {
                entries.push_text(format!("{prefix}{}", params.filename_tree), json);
            }
            if let Some(nwk) = tree_nwk(bundle) {
                entries.push_text(format!("{prefix}{}", params.filename_tree_nwk), nwk);
            }
        }

        if gff.is_empty() {
            debug!("no annotated features, leaving GFF out of the archive");
        } else {
            entries.push_text(&params.filename_gff, gff);
        }
        if tbl.is_empty() {
            debug!("no annotated features, leaving feature table out of the archive");
        } else {
            entries.push_text(&params.filename_tbl, tbl);
        }

        debug!(entries = entries.len(), "assembled archive");
        self.save_zip(entries, filename).await
    }

    fn column_config(&self) -> Result<Arc<CsvColumnConfig>> {
        self.columns
            .current()
            .ok_or_else(|| ExportError::internal("column configuration is not initialized"))
    }

    fn select_dataset(&self, dataset: &str) -> Result<Selection> {
        let bundle = self.catalog.require(dataset)?;
        let outcomes = self.analysis.snapshot();
        Ok(Selection {
            partitioned: partition_by_outcome(&partition_by_dataset(&outcomes, dataset)),
            descriptors: bundle.descriptors.clone(),
        })
    }

    fn select_run(&self) -> Selection {
        let outcomes = self.analysis.snapshot();
        Selection {
            partitioned: partition_by_outcome(&outcomes),
            descriptors: self.catalog.merged_descriptors(),
        }
    }

    async fn format_csv(&self, selection: &Selection, delimiter: u8) -> Result<String> {
        let config = self.column_config()?;
        self.worker
            .serialize_results_csv(
                selection.results(),
                selection.errors(),
                selection.descriptors.clone(),
                CsvColumnConfig::clone(&config),
                delimiter,
            )
            .await
    }

    async fn format_json(&self, selection: &Selection) -> Result<String> {
        self.worker
            .serialize_results_json(
                selection.results(),
                selection.errors(),
                selection.descriptors.clone(),
                self.app_version.clone(),
            )
            .await
    }

    async fn format_ndjson(&self, selection: &Selection) -> Result<String> {
        self.worker
            .serialize_results_ndjson(selection.results(), selection.errors())
            .await
    }

    /// One FASTA entry per gene; records are appended in `index` order.
    fn peptide_entries(&self, successes: &[SuccessOutcome]) -> ZipEntries {
        let mut entries = ZipEntries::new();
        for success in successes {
            for gene in success.translation.genes.values() {
                entries.push(ZipEntry::text(
                    self.params.peptide_filename(&gene.name),
                    format!(">{}\n{}\n", success.seq_name, gene.seq),
                ));
            }
        }
        entries
    }

    async fn save_text(&self, content: String, filename: &str, mime: &'static str) -> Result<SavedArtifact> {
        let filename = filename.to_string();
        self.on_sink(move |sink| sink.save_file(&content, &filename, mime))
            .await
    }

    async fn save_zip(&self, entries: ZipEntries, filename: &str) -> Result<SavedArtifact> {
        let entries = entries.into_vec();
        let filename = filename.to_string();
        self.on_sink(move |sink| sink.save_zip(&entries, &filename))
            .await
    }

    async fn on_sink<F>(&self, write: F) -> Result<SavedArtifact>
    where
        F: FnOnce(&dyn FileSink) -> Result<SavedArtifact> + Send + 'static,
    {
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || write(sink.as_ref()))
            .await
            .map_err(|error| ExportError::internal(format!("file sink task failed: {error}")))?
    }
}

/// `>{seq_name}\n{query}` records joined by newlines, with a final newline.
fn aligned_fasta(successes: &[SuccessOutcome]) -> String {
    let mut fasta = successes
        .iter()
        .map(|success| format!(">{}\n{}", success.seq_name, success.query))
        .collect::<Vec<_>>()
        .join("\n");
    fasta.push('\n');
    fasta
}

fn tree_json(bundle: &DatasetBundle) -> Result<Option<String>> {
    bundle
        .tree
        .as_ref()
        .map(|tree| {
            serde_json::to_string_pretty(tree)
                .map_err(|error| ExportError::Format(FormatError::from(error)))
        })
        .transpose()
}

fn tree_nwk(bundle: &DatasetBundle) -> Option<String> {
    bundle
        .tree_nwk
        .as_ref()
        .filter(|nwk| !nwk.is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clade_model::{GeneTranslation, Translation};

    fn success(index: usize, genes: &[(&str, &str)]) -> SuccessOutcome {
        let mut translation = Translation::default();
        for (name, seq) in genes {
            translation.genes.insert(
                (*name).to_string(),
                GeneTranslation {
                    name: (*name).to_string(),
                    seq: (*seq).to_string(),
                },
            );
        }
        SuccessOutcome {
            index,
            seq_name: format!("seq{index}"),
            analysis_result: AnalysisResult::new(index, format!("seq{index}"), "A"),
            query: "ACGT".to_string(),
            translation,
        }
    }

    #[test]
    fn fasta_has_trailing_newline() {
        let fasta = aligned_fasta(&[success(0, &[]), success(2, &[])]);
        assert_eq!(fasta, ">seq0\nACGT\n>seq2\nACGT\n");
        assert_eq!(aligned_fasta(&[]), "\n");
    }

    #[test]
    fn empty_newick_counts_as_absent() {
        let mut bundle = DatasetBundle::new("A");
        bundle.tree_nwk = Some(String::new());
        assert!(tree_nwk(&bundle).is_none());
        bundle.tree_nwk = Some("(a,b);".to_string());
        assert_eq!(tree_nwk(&bundle).as_deref(), Some("(a,b);"));
    }
}
