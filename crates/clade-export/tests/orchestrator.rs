//! End-to-end exports through the worker into in-memory and directory sinks.

use std::io::{Cursor, Read};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clade_export::{
    AnalysisStore, ColumnConfigStore, DirectorySink, ErrorSlot, ExportError, ExportKind,
    ExportOrchestrator, FileSink, FormatJob, MemoryContent, MemorySink, ResultFormatter,
    SerializationWorkerClient, StandardFormatter, WorkerConfig,
};
use clade_model::selection::{enable_column, set_everything};
use clade_model::{
    AnalysisOutcome, AnalysisResult, CsvColumnConfig, DatasetBundle, DatasetCatalog,
    FailureOutcome, FeatureAnnotation, GeneTranslation, Strand, SuccessOutcome, Translation,
    ZipEntry, mime,
};
use clade_output::FormatError;

fn success(index: usize, dataset: &str, query: &str, genes: &[(&str, &str)]) -> AnalysisOutcome {
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
    AnalysisOutcome::success(SuccessOutcome {
        index,
        seq_name: format!("seq{index}"),
        analysis_result: AnalysisResult::new(index, format!("seq{index}"), dataset),
        query: query.to_string(),
        translation,
    })
}

/// A success carrying one annotated gene.
fn annotated(index: usize, dataset: &str, gene: &str, start: usize, end: usize, strand: Strand) -> AnalysisOutcome {
    let mut outcome = success(index, dataset, "ACGT", &[]);
    if let AnalysisOutcome::Success(success) = &mut outcome {
        success.analysis_result.annotation.push(FeatureAnnotation {
            feature_type: "gene".to_string(),
            name: gene.to_string(),
            start,
            end,
            strand,
        });
    }
    outcome
}

fn failure(index: usize, dataset: Option<&str>, error: &str) -> AnalysisOutcome {
    AnalysisOutcome::failure(FailureOutcome {
        index,
        seq_name: format!("seq{index}"),
        error: error.to_string(),
        dataset_name: dataset.map(str::to_string),
    })
}

/// `index`, `seqName` and `errors` only.
fn narrow_columns() -> CsvColumnConfig {
    let config = set_everything(&CsvColumnConfig::default(), false);
    let config = enable_column(&config, "general", "index", true);
    let config = enable_column(&config, "general", "seqName", true);
    enable_column(&config, "errs-warns", "errors", true)
}

fn catalog() -> DatasetCatalog {
    let mut a = DatasetBundle::new("A");
    a.tree = Some(serde_json::json!({"version": "v2", "tree": {"name": "root"}}));
    a.tree_nwk = Some("(seq0:0.1);".to_string());
    a.genes = vec!["S".to_string()];
    let b = DatasetBundle::new("B");
    DatasetCatalog::new([a, b]).expect("catalog")
}

/// Fails every NDJSON request, formats everything else normally.
struct FailingNdjson;

impl ResultFormatter for FailingNdjson {
    fn format(&self, job: FormatJob) -> Result<String, FormatError> {
        match job {
            FormatJob::ResultsNdjson { .. } => {
                Err(FormatError::Unsupported("ndjson writer exploded".to_string()))
            }
            other => StandardFormatter.format(other),
        }
    }
}

struct Fixture {
    analysis: Arc<AnalysisStore>,
    sink: Arc<MemorySink>,
    errors: Arc<ErrorSlot>,
    orchestrator: Arc<ExportOrchestrator>,
}

fn fixture_with(
    outcomes: Vec<AnalysisOutcome>,
    columns: ColumnConfigStore,
    formatter: impl ResultFormatter,
) -> Fixture {
    let analysis = Arc::new(AnalysisStore::new());
    analysis.extend(outcomes);
    let sink = Arc::new(MemorySink::new());
    let errors = Arc::new(ErrorSlot::new());
    let worker = Arc::new(SerializationWorkerClient::with_formatter(
        WorkerConfig::default(),
        formatter,
    ));
    let orchestrator = ExportOrchestrator::new(
        Arc::clone(&analysis),
        Arc::new(columns),
        Arc::new(catalog()),
        Arc::clone(&sink) as Arc<dyn FileSink>,
    )
    .with_worker(worker)
    .with_error_slot(Arc::clone(&errors));
    Fixture {
        analysis,
        sink,
        errors,
        orchestrator: Arc::new(orchestrator),
    }
}

fn fixture(outcomes: Vec<AnalysisOutcome>) -> Fixture {
    fixture_with(
        outcomes,
        ColumnConfigStore::new(Some(narrow_columns())),
        StandardFormatter,
    )
}

fn three_outcomes() -> Vec<AnalysisOutcome> {
    vec![
        success(0, "A", "AAAA", &[("S", "MFV")]),
        failure(1, None, "no dataset matched"),
        success(2, "B", "CCCC", &[("S", "MFI")]),
    ]
}

fn data_rows(text: &str) -> Vec<&str> {
    text.lines().skip(1).collect()
}

fn entry_text<'a>(entries: &'a [ZipEntry], filename: &str) -> &'a str {
    let entry = entries
        .iter()
        .find(|entry| entry.filename == filename)
        .unwrap_or_else(|| panic!("missing archive entry {filename}"));
    std::str::from_utf8(entry.data.as_bytes()).expect("utf-8")
}

#[tokio::test]
async fn dataset_scoped_tables_hold_only_their_rows() {
    let fx = fixture(three_outcomes());

    fx.orchestrator
        .export_csv("A", "a.csv")
        .await
        .expect("csv for A");
    fx.orchestrator
        .export_tsv("B", "b.tsv")
        .await
        .expect("tsv for B");

    let csv = fx.sink.text("a.csv").expect("a.csv");
    assert_eq!(csv.lines().next(), Some("index;seqName;errors"));
    assert_eq!(data_rows(&csv), ["0;seq0;"]);
    let tsv = fx.sink.text("b.tsv").expect("b.tsv");
    assert_eq!(data_rows(&tsv), ["2\tseq2\t"]);
}

#[tokio::test]
async fn ndjson_for_a_dataset_includes_its_suggested_failures() {
    let mut outcomes = three_outcomes();
    outcomes.push(failure(3, Some("A"), "seed matching failed"));
    let fx = fixture(outcomes);

    fx.orchestrator
        .export(ExportKind::Ndjson, Some("A"), "a.ndjson")
        .await
        .expect("ndjson");

    let ndjson = fx.sink.text("a.ndjson").expect("ndjson");
    insta::assert_snapshot!(ndjson, @r#"
    {"index":0,"seqName":"seq0","datasetName":"A"}
    {"index":3,"seqName":"seq3","errors":["seed matching failed"]}
    "#);
}

#[tokio::test]
async fn everything_archive_covers_the_whole_run() {
    let fx = fixture(three_outcomes());

    let saved = fx
        .orchestrator
        .export_zip("nextclade.zip")
        .await
        .expect("zip");
    assert_eq!(saved.mime, "application/zip");

    let entries = fx.sink.zip_entries("nextclade.zip").expect("archive");
    assert_eq!(
        entry_text(&entries, "nextclade.aligned.fasta"),
        ">seq0\nAAAA\n>seq2\nCCCC\n"
    );
    assert_eq!(
        data_rows(entry_text(&entries, "nextclade.csv")),
        ["0;seq0;", "1;seq1;no dataset matched", "2;seq2;"]
    );
    assert!(entry_text(&entries, "nextclade.ndjson").contains(r#"{"index":1,"seqName":"seq1","errors":["no dataset matched"]}"#));
    assert_eq!(
        entry_text(&entries, "nextclade.peptide.S.fasta"),
        ">seq0\nMFV\n>seq2\nMFI\n"
    );

    let names: Vec<&str> = entries.iter().map(|entry| entry.filename.as_str()).collect();
    assert!(names.contains(&"A/nextclade.auspice.json"));
    assert!(names.contains(&"A/nextclade.nwk"));
    assert!(!names.iter().any(|name| name.starts_with("B/")));
    assert!(!names.contains(&"nextclade.gff"));
    assert!(!names.contains(&"nextclade.tbl"));
    assert!(fx.errors.last().is_none());
}

#[tokio::test]
async fn annotated_results_add_feature_tables() {
    let fx = fixture(vec![
        annotated(2, "B", "N", 100, 200, Strand::Reverse),
        failure(1, None, "no dataset matched"),
        annotated(0, "A", "S", 21562, 25384, Strand::Forward),
    ]);

    fx.orchestrator
        .export_zip("nextclade.zip")
        .await
        .expect("zip");

    let entries = fx.sink.zip_entries("nextclade.zip").expect("archive");
    insta::assert_snapshot!(entry_text(&entries, "nextclade.gff"), @r"
    ##gff-version 3
    seq0	clade-export	gene	21563	25384	.	+	.	Name=S
    seq2	clade-export	gene	101	200	.	-	.	Name=N
    ");
    assert_eq!(
        entry_text(&entries, "nextclade.tbl"),
        ">Feature seq0\n21563\t25384\tgene\n\t\t\tgene\tS\n>Feature seq2\n200\t101\tgene\n\t\t\tgene\tN\n"
    );

    let saved = fx
        .orchestrator
        .export_gff("A", "a.gff")
        .await
        .expect("gff for A");
    assert_eq!(saved.mime, mime::GFF);
    assert_eq!(
        fx.sink.text("a.gff").expect("a.gff"),
        "##gff-version 3\nseq0\tclade-export\tgene\t21563\t25384\t.\t+\t.\tName=S\n"
    );

    let saved = fx
        .orchestrator
        .export_tbl("B", "b.tbl")
        .await
        .expect("tbl for B");
    assert_eq!(saved.mime, mime::TBL);
    assert_eq!(
        fx.sink.text("b.tbl").expect("b.tbl"),
        ">Feature seq2\n200\t101\tgene\n\t\t\tgene\tN\n"
    );
    assert!(fx.errors.last().is_none());
}

#[tokio::test]
async fn failed_sub_format_produces_no_archive_and_one_error() {
    let fx = fixture_with(
        three_outcomes(),
        ColumnConfigStore::new(Some(narrow_columns())),
        FailingNdjson,
    );
    let action = fx
        .orchestrator
        .action(ExportKind::Zip, None)
        .expect("zip is always available");

    let error = action
        .trigger("nextclade.zip")
        .await
        .expect_err("ndjson fails");

    assert!(matches!(*error, ExportError::Format(_)));
    assert!(fx.sink.is_empty());
    assert_eq!(fx.errors.report_count(), 1);
    assert!(!action.state().is_running());
    assert!(!action.state().is_done());
}

#[tokio::test]
async fn missing_column_config_is_an_internal_error() {
    let fx = fixture_with(three_outcomes(), ColumnConfigStore::empty(), StandardFormatter);

    let error = fx
        .orchestrator
        .export_csv("A", "a.csv")
        .await
        .expect_err("no config");
    assert!(error.is_internal());

    let error = fx
        .orchestrator
        .export_excel("nextclade.xlsx")
        .await
        .expect_err("no config");
    assert!(error.is_internal());

    // Formats that do not need columns still work.
    fx.orchestrator
        .export_ndjson("A", "a.ndjson")
        .await
        .expect("ndjson");
    assert_eq!(fx.sink.len(), 1);
}

#[tokio::test]
async fn display_sort_does_not_change_export_order() {
    let fx = fixture(vec![
        success(2, "A", "GG", &[]),
        success(0, "A", "AA", &[]),
        failure(1, Some("A"), "too many mismatches"),
    ]);
    fx.analysis
        .sort_display_by(|a, b| b.seq_name().cmp(a.seq_name()));
    let displayed: Vec<usize> = fx.analysis.displayed().iter().map(AnalysisOutcome::index).collect();
    assert_eq!(displayed, [2, 1, 0]);

    fx.orchestrator
        .export_csv("A", "a.csv")
        .await
        .expect("csv");
    fx.orchestrator
        .export_fasta("A", "a.fasta")
        .await
        .expect("fasta");

    let csv = fx.sink.text("a.csv").expect("csv");
    assert_eq!(
        data_rows(&csv),
        ["0;seq0;", "1;seq1;too many mismatches", "2;seq2;"]
    );
    assert_eq!(fx.sink.text("a.fasta").as_deref(), Some(">seq0\nAA\n>seq2\nGG\n"));
}

#[tokio::test]
async fn optional_exports_follow_dataset_content() {
    let fx = fixture(three_outcomes());

    assert!(fx.orchestrator.action(ExportKind::Tree, Some("B")).is_none());
    assert!(fx.orchestrator.action(ExportKind::Peptides, Some("B")).is_none());
    assert!(fx.orchestrator.action(ExportKind::Csv, Some("B")).is_some());
    assert!(fx.orchestrator.action(ExportKind::Csv, Some("missing")).is_none());
    // More than one dataset: per-dataset kinds need a name.
    assert!(fx.orchestrator.action(ExportKind::Csv, None).is_none());

    let tree = fx
        .orchestrator
        .action(ExportKind::Tree, Some("A"))
        .expect("A has a tree");
    let saved = tree
        .trigger(&tree.default_filename())
        .await
        .expect("tree");
    assert_eq!(saved.filename, "nextclade.auspice.json");
    assert!(tree.state().is_done());
    let json = fx.sink.text("nextclade.auspice.json").expect("tree json");
    assert!(json.starts_with("{\n  \"version\": \"v2\""));

    let error = fx
        .orchestrator
        .export_tree_nwk("B", "b.nwk")
        .await
        .expect_err("B has no newick");
    assert!(matches!(error, ExportError::Unavailable { kind: ExportKind::TreeNwk, .. }));
}

#[tokio::test]
async fn peptides_concatenate_per_gene_in_index_order() {
    let fx = fixture(vec![
        success(3, "A", "A", &[("S", "MFV"), ("N", "MSD")]),
        success(1, "A", "A", &[("S", "MFI")]),
    ]);

    fx.orchestrator
        .export_peptides("A", "peptides.zip")
        .await
        .expect("peptides");

    let entries = fx.sink.zip_entries("peptides.zip").expect("zip");
    let names: Vec<&str> = entries.iter().map(|entry| entry.filename.as_str()).collect();
    assert_eq!(names, ["nextclade.peptide.S.fasta", "nextclade.peptide.N.fasta"]);
    assert_eq!(
        entry_text(&entries, "nextclade.peptide.S.fasta"),
        ">seq1\nMFI\n>seq3\nMFV\n"
    );
}

#[tokio::test]
async fn unclassified_and_excel_exports() {
    let fx = fixture(three_outcomes());

    fx.orchestrator
        .export_unclassified("nextclade.unclassified.tsv")
        .await
        .expect("unclassified");
    let tsv = fx.sink.text("nextclade.unclassified.tsv").expect("tsv");
    assert_eq!(tsv, "index\tseqName\terrors\n1\tseq1\tno dataset matched\n");

    let saved = fx
        .orchestrator
        .export_excel("nextclade.xlsx")
        .await
        .expect("excel");
    assert!(saved.bytes > 0);
    let artifact = fx.sink.get("nextclade.xlsx").expect("xlsx");
    let MemoryContent::Base64(encoded) = artifact.content else {
        panic!("excel should be saved as base64");
    };
    let bytes = STANDARD.decode(encoded).expect("base64");
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("workbook");
    let mut workbook = String::new();
    archive
        .by_name("xl/workbook.xml")
        .expect("workbook part")
        .read_to_string(&mut workbook)
        .expect("read");
    for sheet in ["A", "B", "unclassified"] {
        assert!(workbook.contains(&format!(r#"name="{sheet}""#)), "sheet {sheet}");
    }
}

#[tokio::test]
async fn directory_sink_receives_a_readable_archive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let analysis = Arc::new(AnalysisStore::new());
    analysis.extend(three_outcomes());
    let orchestrator = ExportOrchestrator::new(
        analysis,
        Arc::new(ColumnConfigStore::new(Some(narrow_columns()))),
        Arc::new(catalog()),
        Arc::new(DirectorySink::new(dir.path())),
    )
    .with_worker(Arc::new(SerializationWorkerClient::with_formatter(
        WorkerConfig::default(),
        StandardFormatter,
    )))
    .with_error_slot(Arc::new(ErrorSlot::new()));

    let saved = orchestrator
        .export(ExportKind::Zip, None, "out/nextclade.zip")
        .await
        .expect("zip");
    let path = saved.path.expect("path on disk");
    assert_eq!(path, dir.path().join("out").join("nextclade.zip"));

    let file = std::fs::File::open(&path).expect("open");
    let mut archive = zip::ZipArchive::new(file).expect("archive");
    let mut fasta = String::new();
    archive
        .by_name("nextclade.aligned.fasta")
        .expect("fasta entry")
        .read_to_string(&mut fasta)
        .expect("read");
    assert_eq!(fasta, ">seq0\nAAAA\n>seq2\nCCCC\n");
}
