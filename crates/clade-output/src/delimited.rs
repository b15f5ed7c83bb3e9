//! CSV and TSV writers.

use clade_model::{AnalysisResult, CsvColumnConfig, Descriptors, FailureOutcome};
use csv::WriterBuilder;
use tracing::debug;

use crate::error::Result;
use crate::table::{build_rows, header_row, prepare_columns, row_strings};

pub const CSV_DELIMITER: u8 = b';';
pub const TSV_DELIMITER: u8 = b'\t';

/// Write results and errors as delimited text, one row per sequence in
/// ascending `index` order.
pub fn results_to_csv_string(
    results: &[AnalysisResult],
    errors: &[FailureOutcome],
    descriptors: &Descriptors,
    config: &CsvColumnConfig,
    delimiter: u8,
) -> Result<String> {
    let columns = prepare_columns(descriptors, config);
    let rows = build_rows(results, errors, &columns)?;
    debug!(
        columns = columns.len(),
        rows = rows.len(),
        delimiter = %char::from(delimiter).escape_default(),
        "writing delimited results"
    );

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(header_row(&columns))?;
    for row in &rows {
        writer.write_record(row_strings(row))?;
    }
    finish(writer)
}

/// Write outcomes that were never assigned a dataset.
pub fn unclassified_to_csv_string(errors: &[FailureOutcome], delimiter: u8) -> Result<String> {
    let mut sorted: Vec<&FailureOutcome> = errors.iter().collect();
    sorted.sort_by_key(|error| error.index);

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(["index", "seqName", "errors"])?;
    for error in sorted {
        writer.write_record([
            error.index.to_string().as_str(),
            error.seq_name.as_str(),
            error.error.as_str(),
        ])?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|error| error.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clade_model::selection::{enable_column, set_everything};

    fn result(index: usize, clade: &str) -> AnalysisResult {
        let mut result = AnalysisResult::new(index, format!("seq{index}"), "A");
        result.clade = Some(clade.to_string());
        result
            .payload
            .insert("totalSubstitutions".to_string(), serde_json::json!(index * 3));
        result
    }

    fn config() -> CsvColumnConfig {
        let config = set_everything(&CsvColumnConfig::default(), false);
        let config = enable_column(&config, "general", "index", true);
        let config = enable_column(&config, "general", "seqName", true);
        let config = enable_column(&config, "general", "clade", true);
        let config = enable_column(&config, "general", "totalSubstitutions", true);
        enable_column(&config, "errs-warns", "errors", true)
    }

    #[test]
    fn csv_rows_are_merged_by_index() {
        let errors = [FailureOutcome {
            index: 1,
            seq_name: "seq1".to_string(),
            error: "too many Ns; skipped".to_string(),
            dataset_name: None,
        }];
        let csv = results_to_csv_string(
            &[result(2, "21K"), result(0, "20A")],
            &errors,
            &Descriptors::default(),
            &config(),
            CSV_DELIMITER,
        )
        .expect("csv");
        insta::assert_snapshot!(csv, @r#"
        index;seqName;clade;totalSubstitutions;errors
        0;seq0;20A;0;
        1;seq1;;;"too many Ns; skipped"
        2;seq2;21K;6;
        "#);
    }

    #[test]
    fn tsv_uses_tabs() {
        let tsv = results_to_csv_string(
            &[result(0, "20A")],
            &[],
            &Descriptors::default(),
            &config(),
            TSV_DELIMITER,
        )
        .expect("tsv");
        let mut lines = tsv.lines();
        assert_eq!(lines.next(), Some("index\tseqName\tclade\ttotalSubstitutions\terrors"));
        assert_eq!(lines.next(), Some("0\tseq0\t20A\t0\t"));
    }

    #[test]
    fn unclassified_lists_failures() {
        let errors = [
            FailureOutcome {
                index: 5,
                seq_name: "late".to_string(),
                error: "no dataset".to_string(),
                dataset_name: None,
            },
            FailureOutcome {
                index: 2,
                seq_name: "early".to_string(),
                error: "no dataset".to_string(),
                dataset_name: None,
            },
        ];
        let tsv = unclassified_to_csv_string(&errors, TSV_DELIMITER).expect("tsv");
        assert_eq!(tsv, "index\tseqName\terrors\n2\tearly\tno dataset\n5\tlate\tno dataset\n");
    }
}
